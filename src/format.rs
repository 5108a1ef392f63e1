// src/format.rs
//! Message rendering shared by every channel. Channels differ only in their
//! [`Markup`] token table; structure and ordering are fixed here.

use std::borrow::Cow;

use crate::model::{AggregatedReport, ChangeRecord};

/// Site identity shown in message headers and used to build admin links.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteInfo {
    pub name: String,
    pub home_url: String,
    pub admin_url: String,
}

impl SiteInfo {
    pub fn admin_link(&self, path: &str) -> String {
        format!("{}/{}", self.admin_url.trim_end_matches('/'), path)
    }
}

pub const INTRO_TEXT: &str = "Updates Available";
pub const TEST_TEXT: &str = "This is a test message from Updates Notifier.";
pub const CORE_HEADING: &str = "Core";
pub const PLUGINS_HEADING: &str = "Plugin Updates";
pub const THEMES_HEADING: &str = "Theme Updates";

pub const CORE_ADMIN_PATH: &str = "update-core.php";
pub const PLUGINS_ADMIN_PATH: &str = "plugins.php?plugin_status=upgrade";
pub const THEMES_ADMIN_PATH: &str = "themes.php";

/// Markup token table for one channel.
#[derive(Clone, Copy)]
pub struct Markup {
    pub bold_start: &'static str,
    pub bold_end: &'static str,
    pub italic_start: &'static str,
    pub italic_end: &'static str,
    pub link_start: &'static str,
    pub link_mid: &'static str,
    pub link_end: &'static str,
    pub line_break: &'static str,
    pub escape_text: fn(&str) -> Cow<'_, str>,
    pub escape_url: fn(&str) -> Cow<'_, str>,
}

impl std::fmt::Debug for Markup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Markup")
            .field("bold", &(self.bold_start, self.bold_end))
            .field("italic", &(self.italic_start, self.italic_end))
            .field("link", &(self.link_start, self.link_mid, self.link_end))
            .field("line_break", &self.line_break)
            .finish()
    }
}

fn html_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

fn html_attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// `&`, `<` and `>` are the only characters Slack requires escaped.
fn slack_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Rich-text email.
pub const EMAIL_MARKUP: Markup = Markup {
    bold_start: "<b>",
    bold_end: "</b>",
    italic_start: "<i>",
    italic_end: "</i>",
    link_start: "<a href=\"",
    link_mid: "\">",
    link_end: "</a>",
    line_break: "<br>",
    escape_text: html_text,
    escape_url: html_attr,
};

/// Chat markdown (Slack mrkdwn).
pub const SLACK_MARKUP: Markup = Markup {
    bold_start: "*",
    bold_end: "*",
    italic_start: "_",
    italic_end: "_",
    link_start: "<",
    link_mid: "|",
    link_end: ">",
    line_break: "\n",
    escape_text: slack_text,
    escape_url: slack_text,
};

/// Only absolute http(s) URLs become links; anything else renders as text.
fn linkable(url: &str) -> bool {
    reqwest::Url::parse(url.trim())
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

struct Writer<'m> {
    m: &'m Markup,
    out: String,
}

impl<'m> Writer<'m> {
    fn new(m: &'m Markup) -> Self {
        Self {
            m,
            out: String::new(),
        }
    }

    fn raw(&mut self, s: &str) -> &mut Self {
        self.out.push_str(s);
        self
    }

    fn text(&mut self, s: &str) -> &mut Self {
        let escaped = (self.m.escape_text)(s);
        self.out.push_str(&escaped);
        self
    }

    fn br(&mut self) -> &mut Self {
        self.raw(self.m.line_break)
    }

    fn bold_start(&mut self) -> &mut Self {
        self.raw(self.m.bold_start)
    }

    fn bold_end(&mut self) -> &mut Self {
        self.raw(self.m.bold_end)
    }

    fn link(&mut self, url: &str, label: &str) -> &mut Self {
        let url = (self.m.escape_url)(url);
        self.out.push_str(self.m.link_start);
        self.out.push_str(&url);
        self.out.push_str(self.m.link_mid);
        self.text(label);
        self.raw(self.m.link_end)
    }

    fn site_reference(&mut self, site: &SiteInfo) -> &mut Self {
        self.bold_start().text(&site.name).bold_end().raw(" - ");
        self.link(&site.home_url, &site.home_url)
    }

    fn heading(&mut self, url: &str, label: &str) -> &mut Self {
        self.br().bold_start().link(url, label).bold_end()
    }

    fn versions(&mut self, rec: &ChangeRecord, changelog: Option<&str>) -> &mut Self {
        if rec.old_version.is_empty() || rec.new_version.is_empty() {
            return self;
        }
        self.raw(" (").text(&rec.old_version).raw(" to ");
        match changelog {
            Some(url) => self.link(url, &rec.new_version),
            None => self.text(&rec.new_version),
        };
        self.raw(")")
    }

    fn items(&mut self, records: &[ChangeRecord], with_changelog: bool) -> &mut Self {
        for rec in records {
            self.raw("\t").text(rec.label());
            let changelog = if with_changelog {
                rec.changelog_url().filter(|u| linkable(u))
            } else {
                None
            };
            self.versions(rec, changelog).br();
        }
        self
    }
}

/// Render a report: intro, then core, plugins, themes. Absent/empty
/// sections produce no output at all.
pub fn render(report: &AggregatedReport, site: &SiteInfo, m: &Markup) -> String {
    let mut w = Writer::new(m);

    w.raw(m.italic_start)
        .text(INTRO_TEXT)
        .raw(m.italic_end)
        .br()
        .site_reference(site)
        .br();

    if let Some(core) = &report.core {
        w.heading(&site.admin_link(CORE_ADMIN_PATH), CORE_HEADING)
            .versions(core, None)
            .br();
    }

    if !report.plugins.is_empty() {
        w.heading(&site.admin_link(PLUGINS_ADMIN_PATH), PLUGINS_HEADING)
            .br()
            .items(&report.plugins, true);
    }

    if !report.themes.is_empty() {
        w.heading(&site.admin_link(THEMES_ADMIN_PATH), THEMES_HEADING)
            .br()
            .items(&report.themes, false);
    }

    w.out
}

/// Fixed message used to verify a channel end to end.
pub fn render_test(site: &SiteInfo, m: &Markup) -> String {
    let mut w = Writer::new(m);
    w.text(TEST_TEXT).raw(" ").br().site_reference(site);
    w.out
}
