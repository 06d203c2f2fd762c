// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Encoder for batch upload feeds.

use std::fmt;
use std::io::Cursor;

use jiff::Timestamp;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::contact::ContactRecord;
use crate::error::AtomError;
use crate::schema;
use crate::xml::ns;

/// Extended property names never uploaded.
///
/// These pairs hold local bookkeeping (the local copy of remote ids,
/// version tags and similar); echoing them back would duplicate data the
/// service already owns.
pub const DEFAULT_PROPERTY_BLACKLIST: &[&str] = &[
    "X-REMOTE-ID",
    "X-AVATAR-REV",
    "X-GOOGLE-ETAG",
    "X-GROUP-ID",
    "X-CREATED-AT",
    "X-NORMALIZED_FN",
];

/// Kind of a batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Create a record that does not exist remotely.
    Create,
    /// Update an existing remote record.
    Update,
    /// Delete an existing remote record.
    Delete,
}

impl BatchKind {
    /// Decodes a kind from its wire token.
    #[must_use]
    pub fn from_wire(token: &str) -> Option<Self> {
        match token {
            "insert" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Returns the wire token.
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Create => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl AsRef<str> for BatchKind {
    fn as_ref(&self) -> &str {
        self.as_wire()
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_wire().fmt(f)
    }
}

/// One operation of a batch feed.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    /// What to do with the record.
    pub kind: BatchKind,
    /// The record the operation applies to.
    pub contact: ContactRecord,
}

impl BatchEntry {
    /// Creates a new batch entry.
    #[must_use]
    pub const fn new(kind: BatchKind, contact: ContactRecord) -> Self {
        Self { kind, contact }
    }
}

/// Encoder for batch upload feeds.
///
/// The account email becomes part of edit URLs; without it the encoder
/// falls back to the service's `default` alias, which the service only
/// resolves for reads.
#[derive(Debug, Clone)]
pub struct FeedWriter {
    account: Option<String>,
    blacklist: Vec<String>,
}

impl FeedWriter {
    /// Creates a writer with the default extended property blacklist.
    #[must_use]
    pub fn new(account: Option<String>) -> Self {
        Self {
            account,
            blacklist: DEFAULT_PROPERTY_BLACKLIST
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Replaces the extended property blacklist.
    #[must_use]
    pub fn blacklist<I>(mut self, names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.blacklist = names.into_iter().map(Into::into).collect();
        self
    }

    /// Encodes a page of operations as one batch feed.
    ///
    /// Operations are written in the order given. Each entry carries its
    /// local id as `batch:id`, so the response can be correlated back.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn encode_batch(&self, entries: &[BatchEntry]) -> Result<String, AtomError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        let mut feed = BytesStart::new("atom:feed");
        feed.push_attribute(("xmlns:atom", ns::ATOM));
        feed.push_attribute(("xmlns:gContact", ns::GCONTACT));
        feed.push_attribute(("xmlns:gd", ns::GD));
        feed.push_attribute(("xmlns:batch", ns::BATCH));
        writer.write_event(Event::Start(feed))?;

        for entry in entries {
            self.encode_operation(&mut writer, entry)?;
        }

        writer.write_event(Event::End(BytesEnd::new("atom:feed")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| AtomError::Xml(format!("UTF-8 error: {e}")))
    }

    #[expect(clippy::too_many_lines)]
    fn encode_operation<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        entry: &BatchEntry,
    ) -> Result<(), AtomError> {
        let contact = &entry.contact;

        let mut start = BytesStart::new("atom:entry");
        // The etag attribute is the precondition for updates and deletes.
        if let Some(etag) = &contact.etag {
            start.push_attribute(("gd:etag", etag.as_str()));
        } else if entry.kind != BatchKind::Create {
            tracing::warn!(
                kind = %entry.kind,
                local_id = ?contact.local_id,
                "version tag missing, the service may reject this operation"
            );
        }
        writer.write_event(Event::Start(start))?;

        writer.write_event(Event::Start(BytesStart::new("batch:id")))?;
        if let Some(local_id) = &contact.local_id {
            writer.write_event(Event::Text(BytesText::new(local_id.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new("batch:id")))?;

        let mut operation = BytesStart::new("batch:operation");
        operation.push_attribute(("type", entry.kind.as_wire()));
        writer.write_event(Event::Empty(operation))?;

        if entry.kind == BatchKind::Delete {
            // A delete is just the id plus the etag precondition above.
            self.encode_id(writer, contact)?;
            writer.write_event(Event::End(BytesEnd::new("atom:entry")))?;
            return Ok(());
        }

        encode_category(writer)?;
        if entry.kind == BatchKind::Update {
            self.encode_id(writer, contact)?;
            encode_updated(writer, contact)?;
        }
        encode_unknown_elements(writer, &contact.unknown_elements)?;

        if let Some(name) = contact.name.as_ref().filter(|n| !n.is_empty()) {
            writer.write_event(Event::Start(BytesStart::new("gd:name")))?;
            write_opt_text(writer, "gd:givenName", name.given.as_deref())?;
            write_opt_text(writer, "gd:additionalName", name.additional.as_deref())?;
            write_opt_text(writer, "gd:familyName", name.family.as_deref())?;
            write_opt_text(writer, "gd:namePrefix", name.prefix.as_deref())?;
            write_opt_text(writer, "gd:nameSuffix", name.suffix.as_deref())?;
            writer.write_event(Event::End(BytesEnd::new("gd:name")))?;
        }

        write_opt_text(writer, "gContact:nickname", contact.nickname.as_deref())?;

        if let Some(gender) = contact.gender {
            let mut e = BytesStart::new("gContact:gender");
            e.push_attribute(("value", gender.as_str()));
            writer.write_event(Event::Empty(e))?;
        }

        if let Some(birthday) = contact.birthday {
            let mut e = BytesStart::new("gContact:birthday");
            e.push_attribute(("when", birthday.to_string().as_str()));
            writer.write_event(Event::Empty(e))?;
        }

        write_opt_text(writer, "gContact:occupation", contact.occupation.as_deref())?;

        for phone in &contact.phones {
            if phone.number.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gd:phoneNumber");
            e.push_attribute(("rel", phone.kind.rel()));
            writer.write_event(Event::Start(e))?;
            writer.write_event(Event::Text(BytesText::new(&phone.number)))?;
            writer.write_event(Event::End(BytesEnd::new("gd:phoneNumber")))?;
        }

        for email in &contact.emails {
            if email.address.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gd:email");
            e.push_attribute(("rel", email.context.rel()));
            e.push_attribute(("address", email.address.as_str()));
            writer.write_event(Event::Empty(e))?;
        }

        for address in &contact.addresses {
            let mut e = BytesStart::new("gd:structuredPostalAddress");
            e.push_attribute(("rel", address.context.rel()));
            writer.write_event(Event::Start(e))?;
            write_opt_text(writer, "gd:street", address.street.as_deref())?;
            write_opt_text(writer, "gd:neighborhood", address.locality.as_deref())?;
            write_opt_text(writer, "gd:pobox", address.po_box.as_deref())?;
            write_opt_text(writer, "gd:region", address.region.as_deref())?;
            write_opt_text(writer, "gd:postcode", address.postcode.as_deref())?;
            write_opt_text(writer, "gd:country", address.country.as_deref())?;
            writer.write_event(Event::End(BytesEnd::new("gd:structuredPostalAddress")))?;
        }

        for website in &contact.websites {
            if website.href.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gContact:website");
            e.push_attribute(("rel", website.kind.as_rel()));
            e.push_attribute(("href", website.href.as_str()));
            writer.write_event(Event::Empty(e))?;
        }

        for im in &contact.ims {
            if im.address.is_empty() || im.protocol.as_str().is_empty() {
                tracing::warn!(address = %im.address, "skipping incomplete IM handle");
                continue;
            }
            let mut e = BytesStart::new("gd:im");
            let protocol = format!("{}{}", schema::REL_PREFIX, im.protocol.as_str());
            e.push_attribute(("protocol", protocol.as_str()));
            e.push_attribute(("rel", im.context.rel()));
            e.push_attribute(("address", im.address.as_str()));
            writer.write_event(Event::Empty(e))?;
        }

        for org in &contact.organizations {
            let mut e = BytesStart::new("gd:organization");
            e.push_attribute(("rel", org.context.rel()));
            writer.write_event(Event::Start(e))?;
            write_opt_text(writer, "gd:orgTitle", org.title.as_deref())?;
            write_opt_text(writer, "gd:orgName", org.name.as_deref())?;
            write_opt_text(writer, "gd:orgDepartment", org.department.as_deref())?;
            write_opt_text(writer, "gd:orgJobDescription", org.job_description.as_deref())?;
            write_opt_text(writer, "gd:orgSymbol", org.symbol.as_deref())?;
            writer.write_event(Event::End(BytesEnd::new("gd:organization")))?;
        }

        for note in &contact.notes {
            if note.text.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gContact:jot");
            e.push_attribute(("rel", note.context.as_str()));
            writer.write_event(Event::Start(e))?;
            writer.write_event(Event::Text(BytesText::new(&note.text)))?;
            writer.write_event(Event::End(BytesEnd::new("gContact:jot")))?;
        }

        for hobby in &contact.hobbies {
            write_opt_text(writer, "gContact:hobby", Some(hobby))?;
        }

        for anniversary in &contact.anniversaries {
            let Some(date) = anniversary.date else {
                continue;
            };
            if anniversary.description.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gContact:event");
            e.push_attribute(("rel", "anniversary"));
            e.push_attribute(("label", anniversary.label.as_str()));
            writer.write_event(Event::Start(e))?;
            let mut when = BytesStart::new("gd:when");
            when.push_attribute(("startTime", date.to_string().as_str()));
            when.push_attribute(("valueString", anniversary.description.as_str()));
            writer.write_event(Event::Empty(when))?;
            writer.write_event(Event::End(BytesEnd::new("gContact:event")))?;
        }

        for relation in &contact.relations {
            if relation.name.is_empty() {
                continue;
            }
            let mut e = BytesStart::new("gContact:relation");
            e.push_attribute(("rel", relation.kind.as_str()));
            writer.write_event(Event::Start(e))?;
            writer.write_event(Event::Text(BytesText::new(&relation.name)))?;
            writer.write_event(Event::End(BytesEnd::new("gContact:relation")))?;
        }

        if let Some(favorite) = contact.favorite {
            write_extended_property(writer, "X-FAVORITE", if favorite { "true" } else { "false" })?;
        }

        if let Some(ringtone) = contact.ringtone.as_ref().filter(|r| !r.is_empty()) {
            write_extended_property(writer, "SOUND", ringtone)?;
        }

        for prop in &contact.extended {
            if prop.name.is_empty() || self.blacklist.iter().any(|b| b == &prop.name) {
                continue;
            }
            write_extended_property(writer, &prop.name, &prop.value)?;
        }

        // The service hides groupless contacts, so always write at least
        // the default group.
        if contact.groups.is_empty() {
            self.encode_group(writer, schema::DEFAULT_GROUP_ID)?;
        } else {
            for group in &contact.groups {
                self.encode_group(writer, group)?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("atom:entry")))?;
        Ok(())
    }

    fn encode_id<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        contact: &ContactRecord,
    ) -> Result<(), AtomError> {
        let Some(remote_id) = &contact.remote_id else {
            return Ok(());
        };
        let Some(account) = self.account.as_deref() else {
            tracing::warn!("account email not known, unable to build entry edit id");
            return Ok(());
        };

        let short_id = remote_id
            .as_str()
            .rsplit(':')
            .next()
            .unwrap_or(remote_id.as_str());
        let url = format!("{}/{account}/full/{short_id}", schema::CONTACTS_FEED_BASE);
        writer.write_event(Event::Start(BytesStart::new("atom:id")))?;
        writer.write_event(Event::Text(BytesText::new(&url)))?;
        writer.write_event(Event::End(BytesEnd::new("atom:id")))?;
        Ok(())
    }

    fn encode_group<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        group_id: &str,
    ) -> Result<(), AtomError> {
        let account = self.account.as_deref().unwrap_or("default");
        let href = format!("{}/{account}/base/{group_id}", schema::GROUPS_FEED_BASE);
        let mut e = BytesStart::new("gContact:groupMembershipInfo");
        e.push_attribute(("deleted", "false"));
        e.push_attribute(("href", href.as_str()));
        writer.write_event(Event::Empty(e))?;
        Ok(())
    }
}

fn encode_category<W: std::io::Write>(writer: &mut Writer<W>) -> Result<(), AtomError> {
    let mut e = BytesStart::new("atom:category");
    e.push_attribute(("schema", schema::CATEGORY_SCHEME));
    e.push_attribute(("term", schema::CATEGORY_TERM));
    writer.write_event(Event::Empty(e))?;
    Ok(())
}

fn encode_updated<W: std::io::Write>(
    writer: &mut Writer<W>,
    contact: &ContactRecord,
) -> Result<(), AtomError> {
    let updated = contact.updated.unwrap_or_else(Timestamp::now);
    let text = updated.strftime("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    writer.write_event(Event::Start(BytesStart::new("updated")))?;
    writer.write_event(Event::Text(BytesText::new(&text)))?;
    writer.write_event(Event::End(BytesEnd::new("updated")))?;
    Ok(())
}

fn encode_unknown_elements<W: std::io::Write>(
    writer: &mut Writer<W>,
    fragments: &[String],
) -> Result<(), AtomError> {
    for fragment in fragments {
        // Fragments were captured verbatim; re-emit them unescaped.
        writer.write_event(Event::Text(BytesText::from_escaped(fragment.as_str())))?;
    }
    Ok(())
}

fn write_opt_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    element: &str,
    value: Option<&str>,
) -> Result<(), AtomError> {
    let Some(value) = value else {
        return Ok(());
    };
    if value.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(element)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

fn write_extended_property<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), AtomError> {
    let mut e = BytesStart::new("gd:extendedProperty");
    e.push_attribute(("name", name));
    e.push_attribute(("value", value));
    writer.write_event(Event::Empty(e))?;
    Ok(())
}
