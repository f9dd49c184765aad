use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::model::{Flag, QcState, qc_label};

pub const PAGE_BROWSER_ID: &str = "page_browser";
pub const PAGE_BROWSER_FULL_CLASS: &str = "page_browser_full";
pub const LANE_TAB_ID_PREFIX: &str = "nav_tab_";
pub const RESULTS_PANEL_ID: &str = "page_browser_lui";
pub const SIDEBAR_CLASS: &str = "side-nav-wrapper";
pub const INTERNAL_SECTION_CLASS: &str = "unhideme";

pub const PANEL_HEADING: &str = "Lane-usable flag in clarity:";
pub const TRIGGER_IDLE_TEXT: &str = "Edit";
pub const TRIGGER_SAVING_TEXT: &str = "Saving to the LIMS...";

/// The parts of a report page the flag widget reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportPage {
    pub browser: Option<PageBrowser>,
    pub sidebar: Option<Sidebar>,
    pub internal_sections: Vec<InternalSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageBrowser {
    pub run_id: Option<String>,
    pub full: bool,
    pub hidden: bool,
    pub tabs: Vec<LaneTab>,
    /// Whether `#page_browser_lui` exists; without it nothing is drawn.
    pub has_panel: bool,
    pub panel: Panel,
    pub trigger: Option<TriggerControl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaneTab {
    pub lane: String,
    pub active: bool,
    pub state: Option<QcState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sidebar {
    pub state: Option<QcState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InternalSection {
    pub tag: String,
    pub id: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    #[default]
    Empty,
    Flag(FlagPanel),
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagPanel {
    pub heading: String,
    pub qc_label: String,
    pub reason: Option<String>,
    pub state: QcState,
}

impl FlagPanel {
    pub fn for_flag(flag: &Flag) -> Self {
        Self {
            heading: PANEL_HEADING.to_string(),
            qc_label: qc_label(&Value::from(flag.qc)).into_owned(),
            reason: flag.reason_text().map(ToOwned::to_owned),
            state: flag.state(),
        }
    }

    /// `"No -- contamination"`, or just the label when there is no reason.
    pub fn summary(&self) -> String {
        match &self.reason {
            Some(reason) => format!("{} -- {}", self.qc_label, reason),
            None => self.qc_label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerControl {
    pub text: String,
    pub enabled: bool,
}

impl TriggerControl {
    pub fn idle() -> Self {
        Self {
            text: TRIGGER_IDLE_TEXT.to_string(),
            enabled: true,
        }
    }

    pub fn saving() -> Self {
        Self {
            text: TRIGGER_SAVING_TEXT.to_string(),
            enabled: false,
        }
    }
}

impl ReportPage {
    /// A bare page with a full-mode browser showing one active lane.
    pub fn for_lane(run_id: &str, lane: &str) -> Self {
        Self {
            browser: Some(PageBrowser {
                run_id: Some(run_id.to_string()),
                full: true,
                hidden: false,
                tabs: vec![LaneTab {
                    lane: lane.to_string(),
                    active: true,
                    state: None,
                }],
                has_panel: true,
                panel: Panel::Empty,
                trigger: None,
            }),
            sidebar: Some(Sidebar::default()),
            internal_sections: Vec::new(),
        }
    }

    /// Reads the widget's DOM contract out of a rendered report.
    pub fn parse_html(html: &str) -> Result<Self> {
        let tag_pattern = Regex::new(r"<([A-Za-z][A-Za-z0-9]*)\b([^>]*)>")
            .context("failed to compile start tag regex")?;
        let attr_pattern = Regex::new(
            r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#,
        )
        .context("failed to compile attribute regex")?;
        let hidden_style =
            Regex::new(r"(?i)display\s*:\s*none").context("failed to compile style regex")?;
        let comment_pattern =
            Regex::new(r"(?s)<!--.*?-->").context("failed to compile comment regex")?;

        let html = comment_pattern.replace_all(html, "");
        let html = html.as_ref();

        let mut page = Self::default();
        let mut browser: Option<PageBrowser> = None;
        let mut browser_extent = 0..0;
        let mut tabs = Vec::new();

        for captures in tag_pattern.captures_iter(html) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let tag = captures[1].to_ascii_lowercase();
            let in_browser = browser_extent.contains(&whole.start());
            let attrs = parse_attributes(&attr_pattern, &captures[2]);
            let id = attrs.get("id").map(String::as_str);
            let classes: Vec<&str> = attrs
                .get("class")
                .map(|class| class.split_whitespace().collect())
                .unwrap_or_default();

            if id == Some(PAGE_BROWSER_ID) && browser.is_none() {
                let hidden = attrs.contains_key("hidden")
                    || attrs
                        .get("style")
                        .is_some_and(|style| hidden_style.is_match(style));
                browser = Some(PageBrowser {
                    run_id: attrs.get("runid").cloned(),
                    full: classes.contains(&PAGE_BROWSER_FULL_CLASS),
                    hidden,
                    ..PageBrowser::default()
                });
                browser_extent = whole.end()..element_end(html, whole.end(), &tag)?;
            }

            if in_browser && id == Some(RESULTS_PANEL_ID) {
                if let Some(browser) = browser.as_mut() {
                    browser.has_panel = true;
                }
            }

            if in_browser && tag == "li" {
                if let Some(lane) = id.and_then(|id| id.strip_prefix(LANE_TAB_ID_PREFIX)) {
                    tabs.push(LaneTab {
                        lane: lane.to_string(),
                        active: classes.contains(&"active"),
                        state: state_from_classes(&classes),
                    });
                }
            }

            if classes.contains(&SIDEBAR_CLASS) && page.sidebar.is_none() {
                page.sidebar = Some(Sidebar {
                    state: state_from_classes(&classes),
                });
            }

            if classes.contains(&INTERNAL_SECTION_CLASS) {
                page.internal_sections.push(InternalSection {
                    tag,
                    id: id.map(ToOwned::to_owned),
                    visible: false,
                });
            }
        }

        if let Some(mut browser) = browser {
            browser.tabs = tabs;
            page.browser = Some(browser);
        }

        Ok(page)
    }

    pub fn run_id(&self) -> Option<&str> {
        self.browser.as_ref()?.run_id.as_deref()
    }

    /// The lane of the tab marked active, taken from its `nav_tab_<lane>` id.
    pub fn active_lane(&self) -> Option<&str> {
        self.browser
            .as_ref()?
            .tabs
            .iter()
            .find(|tab| tab.active)
            .map(|tab| tab.lane.as_str())
    }

    pub fn set_run_id(&mut self, run_id: &str) {
        if let Some(browser) = self.browser.as_mut() {
            browser.run_id = Some(run_id.to_string());
        }
    }

    /// Moves the active marker to `lane`, adding a tab when the page has none.
    pub fn set_active_lane(&mut self, lane: &str) {
        let Some(browser) = self.browser.as_mut() else {
            return;
        };

        for tab in &mut browser.tabs {
            tab.active = tab.lane == lane;
        }
        if !browser.tabs.iter().any(|tab| tab.active) {
            browser.tabs.push(LaneTab {
                lane: lane.to_string(),
                active: true,
                state: None,
            });
        }
    }

    pub fn tab(&self, lane: &str) -> Option<&LaneTab> {
        self.browser
            .as_ref()?
            .tabs
            .iter()
            .find(|tab| tab.lane == lane)
    }

    /// Replaces whatever state class the lane's tab carried. Returns false when
    /// the page has no tab for that lane.
    pub fn set_tab_state(&mut self, lane: &str, state: QcState) -> bool {
        let Some(browser) = self.browser.as_mut() else {
            return false;
        };
        match browser.tabs.iter_mut().find(|tab| tab.lane == lane) {
            Some(tab) => {
                tab.state = Some(state);
                true
            }
            None => false,
        }
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.browser.as_ref().map(|browser| &browser.panel)
    }

    pub fn set_panel(&mut self, panel: Panel) {
        if let Some(browser) = self.browser.as_mut().filter(|b| b.has_panel) {
            browser.panel = panel;
        }
    }

    pub fn set_sidebar_state(&mut self, state: QcState) {
        if let Some(sidebar) = self.sidebar.as_mut() {
            sidebar.state = Some(state);
        }
    }

    pub fn sidebar_state(&self) -> Option<QcState> {
        self.sidebar.as_ref()?.state
    }

    pub fn trigger(&self) -> Option<&TriggerControl> {
        self.browser.as_ref()?.trigger.as_ref()
    }

    /// The trigger lives inside the results panel, so a page without one
    /// never gets a trigger.
    pub fn set_trigger(&mut self, trigger: TriggerControl) {
        if let Some(browser) = self.browser.as_mut().filter(|b| b.has_panel) {
            browser.trigger = Some(trigger);
        }
    }

    /// Sets the enabled flag on an existing trigger without touching its text.
    pub fn set_trigger_enabled(&mut self, enabled: bool) {
        if let Some(trigger) = self.browser.as_mut().and_then(|b| b.trigger.as_mut()) {
            trigger.enabled = enabled;
        }
    }

    /// Shows every internal-only section and returns how many there were.
    pub fn reveal_internal_sections(&mut self) -> usize {
        for section in &mut self.internal_sections {
            section.visible = true;
        }
        self.internal_sections.len()
    }
}

/// Offset of the tag closing the element whose start tag ends at `from`.
/// An unclosed element runs to the end of the document.
fn element_end(html: &str, from: usize, tag: &str) -> Result<usize> {
    let pattern = Regex::new(&format!(r"(?i)<(/?){}\b[^>]*?(/?)>", regex::escape(tag)))
        .with_context(|| format!("failed to compile element regex for <{tag}>"))?;

    let mut depth = 1_usize;
    for captures in pattern.captures_iter(&html[from..]) {
        let closing = !captures[1].is_empty();
        let self_closing = !captures[2].is_empty();
        if closing {
            depth -= 1;
            if depth == 0 {
                return Ok(from + captures.get(0).map_or(0, |m| m.start()));
            }
        } else if !self_closing {
            depth += 1;
        }
    }

    Ok(html.len())
}

fn parse_attributes(pattern: &Regex, raw: &str) -> HashMap<String, String> {
    pattern
        .captures_iter(raw)
        .map(|captures| {
            let name = captures[1].to_ascii_lowercase();
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

fn state_from_classes(classes: &[&str]) -> Option<QcState> {
    [QcState::True, QcState::False, QcState::Null]
        .into_iter()
        .find(|state| classes.contains(&state.as_class()))
}
