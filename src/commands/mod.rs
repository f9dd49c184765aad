pub mod detect;
pub mod inspect;
pub mod set;
pub mod show;

mod output;
mod session;
