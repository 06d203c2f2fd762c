// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Finite vocabularies of the GData contact schema.
//!
//! The wire format expresses detail kinds as `rel` URIs drawn from small
//! closed sets. Decoding never fails on an unknown value: lookups return
//! `None` (or a documented default) and the caller downgrades the value to
//! its `other` form, so one exotic contact cannot poison a whole feed.

use std::fmt;

/// Prefix shared by every `rel` URI in the `gd` vocabulary.
pub const REL_PREFIX: &str = "http://schemas.google.com/g/2005#";

/// `schema` attribute of the `atom:category` element on contact entries.
pub const CATEGORY_SCHEME: &str = "http://schemas.google.com/g/2005#kind";

/// `term` attribute of the `atom:category` element on contact entries.
pub const CATEGORY_TERM: &str = "http://schemas.google.com/contact/2008#contact";

/// `rel` of the entry link that carries the contact photo.
pub const PHOTO_REL: &str = "http://schemas.google.com/contacts/2008/rel#photo";

/// Base URL of contact entry ids.
pub const CONTACTS_FEED_BASE: &str = "http://www.google.com/m8/feeds/contacts";

/// Base URL of group membership hrefs.
pub const GROUPS_FEED_BASE: &str = "http://www.google.com/m8/feeds/groups";

/// Group id every uploaded contact falls back to ("My Contacts").
///
/// The service hides contacts that belong to no group, so the encoder
/// attaches this group whenever a record does not name one.
pub const DEFAULT_GROUP_ID: &str = "6";

/// Usage context of a detail (home, work or unspecified).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Context {
    /// Personal usage.
    Home,
    /// Professional usage.
    Work,
    /// Unspecified or unrecognized usage.
    #[default]
    Other,
}

impl Context {
    /// Decodes a context from a `rel` URI.
    ///
    /// Only the fragment after `#` is significant. Unknown and empty
    /// fragments map to [`Context::Other`].
    #[must_use]
    pub fn from_rel(rel: &str) -> Self {
        match rel.rsplit('#').next().unwrap_or(rel) {
            "home" => Self::Home,
            "work" => Self::Work,
            _ => Self::Other,
        }
    }

    /// Returns the bare context token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Other => "other",
        }
    }

    /// Returns the full `rel` URI for this context.
    #[must_use]
    pub const fn rel(self) -> &'static str {
        match self {
            Self::Home => "http://schemas.google.com/g/2005#home",
            Self::Work => "http://schemas.google.com/g/2005#work",
            Self::Other => "http://schemas.google.com/g/2005#other",
        }
    }
}

impl AsRef<str> for Context {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Kind of a phone number, folding usage context and device class into one
/// wire token the way the schema does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PhoneKind {
    /// Home landline.
    Home,
    /// Work landline.
    Work,
    /// Personal mobile.
    Mobile,
    /// Work mobile.
    WorkMobile,
    /// Home fax.
    HomeFax,
    /// Work fax.
    WorkFax,
    /// Fax with no usage context.
    OtherFax,
    /// Personal pager.
    Pager,
    /// Work pager.
    WorkPager,
    /// TTY/TDD device.
    TtyTdd,
    /// Car phone.
    Car,
    /// Telex.
    Telex,
    /// Assistant's number.
    Assistant,
    /// Main number.
    Main,
    /// Landline with no usage context, also the fallback for unrecognized
    /// tokens.
    #[default]
    Other,
}

impl PhoneKind {
    /// Decodes a phone kind from its full `rel` URI.
    ///
    /// Returns `None` for unknown URIs so the caller can log the value
    /// before falling back to [`PhoneKind::Other`].
    #[must_use]
    pub fn from_rel(rel: &str) -> Option<Self> {
        match rel.rsplit('#').next().unwrap_or(rel) {
            "home" => Some(Self::Home),
            "work" => Some(Self::Work),
            "mobile" => Some(Self::Mobile),
            "work_mobile" => Some(Self::WorkMobile),
            "home_fax" => Some(Self::HomeFax),
            "work_fax" => Some(Self::WorkFax),
            "other_fax" => Some(Self::OtherFax),
            "pager" => Some(Self::Pager),
            "work_pager" => Some(Self::WorkPager),
            "tty_tdd" => Some(Self::TtyTdd),
            "car" => Some(Self::Car),
            "telex" => Some(Self::Telex),
            "assistant" => Some(Self::Assistant),
            "main" => Some(Self::Main),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Returns the bare kind token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Mobile => "mobile",
            Self::WorkMobile => "work_mobile",
            Self::HomeFax => "home_fax",
            Self::WorkFax => "work_fax",
            Self::OtherFax => "other_fax",
            Self::Pager => "pager",
            Self::WorkPager => "work_pager",
            Self::TtyTdd => "tty_tdd",
            Self::Car => "car",
            Self::Telex => "telex",
            Self::Assistant => "assistant",
            Self::Main => "main",
            Self::Other => "other",
        }
    }

    /// Returns the full `rel` URI for this kind.
    #[must_use]
    pub const fn rel(self) -> &'static str {
        match self {
            Self::Home => "http://schemas.google.com/g/2005#home",
            Self::Work => "http://schemas.google.com/g/2005#work",
            Self::Mobile => "http://schemas.google.com/g/2005#mobile",
            Self::WorkMobile => "http://schemas.google.com/g/2005#work_mobile",
            Self::HomeFax => "http://schemas.google.com/g/2005#home_fax",
            Self::WorkFax => "http://schemas.google.com/g/2005#work_fax",
            Self::OtherFax => "http://schemas.google.com/g/2005#other_fax",
            Self::Pager => "http://schemas.google.com/g/2005#pager",
            Self::WorkPager => "http://schemas.google.com/g/2005#work_pager",
            Self::TtyTdd => "http://schemas.google.com/g/2005#tty_tdd",
            Self::Car => "http://schemas.google.com/g/2005#car",
            Self::Telex => "http://schemas.google.com/g/2005#telex",
            Self::Assistant => "http://schemas.google.com/g/2005#assistant",
            Self::Main => "http://schemas.google.com/g/2005#main",
            Self::Other => "http://schemas.google.com/g/2005#other",
        }
    }
}

impl AsRef<str> for PhoneKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PhoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Instant messaging protocol.
///
/// Unrecognized protocols are preserved verbatim in [`ImProtocol::Other`]
/// rather than collapsed, so they survive a round trip untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImProtocol {
    /// AOL Instant Messenger.
    Aim,
    /// Google Talk.
    GoogleTalk,
    /// ICQ.
    Icq,
    /// IRC.
    Irc,
    /// Jabber / XMPP.
    Jabber,
    /// Microsoft Messenger.
    Msn,
    /// Tencent QQ.
    Qq,
    /// Skype.
    Skype,
    /// Yahoo Messenger.
    Yahoo,
    /// Any protocol outside the known set, kept verbatim.
    Other(String),
}

impl ImProtocol {
    /// Decodes a protocol from its wire token or full `rel` URI.
    #[must_use]
    pub fn from_wire(protocol: &str) -> Self {
        match protocol.rsplit('#').next().unwrap_or(protocol) {
            "AIM" => Self::Aim,
            "GOOGLE_TALK" => Self::GoogleTalk,
            "ICQ" => Self::Icq,
            "IRC" => Self::Irc,
            "JABBER" => Self::Jabber,
            "MSN" => Self::Msn,
            "QQ" => Self::Qq,
            "SKYPE" => Self::Skype,
            "YAHOO" => Self::Yahoo,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the bare wire token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Aim => "AIM",
            Self::GoogleTalk => "GOOGLE_TALK",
            Self::Icq => "ICQ",
            Self::Irc => "IRC",
            Self::Jabber => "JABBER",
            Self::Msn => "MSN",
            Self::Qq => "QQ",
            Self::Skype => "SKYPE",
            Self::Yahoo => "YAHOO",
            Self::Other(name) => name,
        }
    }
}

impl AsRef<str> for ImProtocol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ImProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Label of an anniversary event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventLabel {
    /// Wedding anniversary, also the fallback for unrecognized labels.
    #[default]
    Wedding,
    /// Engagement anniversary.
    Engagement,
    /// Employment anniversary.
    Employment,
    /// Memorial date.
    Memorial,
    /// House anniversary.
    House,
}

impl EventLabel {
    /// Decodes an event label.
    ///
    /// Returns `None` for unknown labels so the caller can log the value
    /// before falling back to [`EventLabel::Wedding`].
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "wedding" => Some(Self::Wedding),
            "engagement" => Some(Self::Engagement),
            "employment" => Some(Self::Employment),
            "memorial" => Some(Self::Memorial),
            "house" => Some(Self::House),
            _ => None,
        }
    }

    /// Returns the bare label token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wedding => "wedding",
            Self::Engagement => "engagement",
            Self::Employment => "employment",
            Self::Memorial => "memorial",
            Self::House => "house",
        }
    }
}

impl AsRef<str> for EventLabel {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for EventLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Kind of a website link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebsiteKind {
    /// Personal home page.
    HomePage,
    /// Blog.
    Blog,
    /// Any other link, classified by usage context only.
    Context(Context),
}

impl WebsiteKind {
    /// Decodes a website kind from its `rel` token.
    #[must_use]
    pub fn from_rel(rel: &str) -> Self {
        match rel {
            "home-page" => Self::HomePage,
            "blog" => Self::Blog,
            _ => Self::Context(Context::from_rel(rel)),
        }
    }

    /// Returns the `rel` token for this kind.
    #[must_use]
    pub const fn as_rel(self) -> &'static str {
        match self {
            Self::HomePage => "home-page",
            Self::Blog => "blog",
            Self::Context(context) => context.as_str(),
        }
    }
}

impl Default for WebsiteKind {
    fn default() -> Self {
        Self::Context(Context::Other)
    }
}

impl AsRef<str> for WebsiteKind {
    fn as_ref(&self) -> &str {
        self.as_rel()
    }
}

impl fmt::Display for WebsiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_rel().fmt(f)
    }
}

/// Kind of a family relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Spouse.
    Spouse,
    /// Child.
    Child,
}

impl RelationKind {
    /// Decodes a relation kind.
    ///
    /// Returns `None` for relations outside the supported set; the caller
    /// logs and drops those.
    #[must_use]
    pub fn from_rel(rel: &str) -> Option<Self> {
        match rel {
            "spouse" => Some(Self::Spouse),
            "child" => Some(Self::Child),
            _ => None,
        }
    }

    /// Returns the bare relation token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spouse => "spouse",
            Self::Child => "child",
        }
    }
}

impl AsRef<str> for RelationKind {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Gender of a contact.
///
/// The wire value is free text; anything that does not start with `m` or
/// `f` is dropped during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Gender {
    /// Decodes a gender from its wire value.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        let lower = value.to_lowercase();
        if lower.starts_with('m') {
            Some(Self::Male)
        } else if lower.starts_with('f') {
            Some(Self::Female)
        } else {
            None
        }
    }

    /// Returns the bare wire value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl AsRef<str> for Gender {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}
