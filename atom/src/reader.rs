// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Decoder for contact feeds and batch response feeds.

use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::contact::{
    Anniversary, Avatar, ContactRecord, Email, ExtendedProperty, ImHandle, Note, Organization,
    Phone, PostalAddress, Relation, StructuredName, Website,
};
use crate::error::AtomError;
use crate::schema::{
    self, Context, EventLabel, Gender, ImProtocol, PhoneKind, RelationKind, WebsiteKind,
};
use crate::types::{LocalId, RemoteId, VersionTag};
use crate::writer::BatchKind;
use crate::xml;

/// Extended property carrying the favorite flag.
const PROP_FAVORITE: &str = "X-FAVORITE";

/// Extended property carrying the ringtone URL.
const PROP_SOUND: &str = "SOUND";

/// A decoded contact feed.
///
/// One parse produces one of three shapes depending on what the server
/// sent: a page of contacts (`contacts` plus `deleted` tombstones), a
/// batch response (`batch_responses`), or a single bare entry wrapped as
/// a one-element feed.
#[derive(Debug, Clone, Default)]
pub struct ContactFeed {
    /// Feed id.
    pub id: Option<String>,
    /// Feed title.
    pub title: Option<String>,
    /// Feed-level update time, verbatim.
    pub updated: Option<String>,
    /// Author name.
    pub author_name: Option<String>,
    /// Author email.
    pub author_email: Option<String>,
    /// Total matching entries reported by the server.
    pub total_results: Option<u32>,
    /// One-based index of the first entry in this page.
    pub start_index: Option<u32>,
    /// Page size reported by the server.
    pub items_per_page: Option<u32>,
    /// URL of the next page, when the feed is truncated.
    pub next_url: Option<String>,
    /// Live contact entries.
    pub contacts: Vec<ContactRecord>,
    /// Tombstones for contacts deleted on the remote side.
    pub deleted: Vec<ContactRecord>,
    /// Per-operation results of a batch upload.
    pub batch_responses: Vec<BatchResponse>,
}

impl ContactFeed {
    /// Whether the server reported another page after this one.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next_url.is_some()
    }
}

/// Result of one batch operation, correlated by the `batch:id` the
/// request carried.
#[derive(Debug, Clone)]
pub struct BatchResponse {
    /// Correlation token, echoing the local id the request was keyed by.
    pub local_id: Option<LocalId>,
    /// Kind of operation this result answers.
    pub kind: Option<BatchKind>,
    /// Wire status code, as text.
    pub code: String,
    /// Short status reason.
    pub reason: String,
    /// Longer status description, when the server sent one.
    pub description: String,
    /// The echoed entry payload. Empty for delete results.
    pub contact: ContactRecord,
}

impl BatchResponse {
    /// Whether the operation succeeded.
    ///
    /// `304` counts as success: the server is reporting the record
    /// already matched what was sent.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.code.as_str(), "200" | "201" | "304")
    }
}

#[derive(Debug, Default)]
struct BatchParts {
    local_id: Option<LocalId>,
    kind: Option<BatchKind>,
    code: String,
    reason: String,
    description: String,
}

#[derive(Debug)]
struct Entry {
    record: ContactRecord,
    in_group: bool,
    deleted: bool,
    batch: Option<BatchParts>,
}

/// Parses a contact feed, a batch response feed, or a bare entry document.
///
/// Entries that belong to no group are dropped: the server reports every
/// address it has ever auto-collected, and only grouped contacts are real
/// address book members.
///
/// # Errors
///
/// Returns an error if the XML is malformed or the root element is not a
/// feed or an entry.
pub fn parse_feed(input: &str) -> Result<ContactFeed, AtomError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut feed = ContactFeed::default();
    let mut in_feed = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"feed" | b"atom:feed" if !in_feed => in_feed = true,
                b"entry" | b"atom:entry" => {
                    let entry = parse_entry(&mut reader, e)?;
                    classify_entry(entry, &mut feed);
                    if !in_feed {
                        // Bare entry document, nothing more follows.
                        break;
                    }
                }
                b"id" | b"atom:id" if in_feed => {
                    feed.id = Some(xml::read_text(&mut reader, e.name().as_ref())?);
                }
                b"title" | b"atom:title" if in_feed => {
                    feed.title = Some(xml::read_text(&mut reader, e.name().as_ref())?);
                }
                b"updated" | b"atom:updated" if in_feed => {
                    feed.updated = Some(xml::read_text(&mut reader, e.name().as_ref())?);
                }
                b"author" | b"atom:author" if in_feed => parse_author(&mut reader, &mut feed)?,
                b"openSearch:totalResults" | b"totalResults" => {
                    feed.total_results =
                        xml::read_text(&mut reader, e.name().as_ref())?.parse().ok();
                }
                b"openSearch:startIndex" | b"startIndex" => {
                    feed.start_index = xml::read_text(&mut reader, e.name().as_ref())?.parse().ok();
                }
                b"openSearch:itemsPerPage" | b"itemsPerPage" => {
                    feed.items_per_page =
                        xml::read_text(&mut reader, e.name().as_ref())?.parse().ok();
                }
                b"link" | b"atom:link" => {
                    parse_feed_link(e, &mut feed)?;
                    xml::skip_element(&mut reader, e.name().as_ref())?;
                }
                _ if in_feed => xml::skip_element(&mut reader, e.name().as_ref())?,
                other => {
                    return Err(AtomError::NotAFeed(format!(
                        "unexpected root element {}",
                        String::from_utf8_lossy(other)
                    )));
                }
            },
            Event::Empty(ref e) => {
                if matches!(e.name().as_ref(), b"link" | b"atom:link") {
                    parse_feed_link(e, &mut feed)?;
                }
            }
            Event::End(ref e) if matches!(e.name().as_ref(), b"feed" | b"atom:feed") => break,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(feed)
}

fn classify_entry(entry: Entry, feed: &mut ContactFeed) {
    if let Some(parts) = entry.batch {
        feed.batch_responses.push(BatchResponse {
            local_id: parts.local_id,
            kind: parts.kind,
            code: parts.code,
            reason: parts.reason,
            description: parts.description,
            contact: entry.record,
        });
    } else if entry.in_group {
        if entry.deleted {
            let mut record = entry.record;
            // The wire tombstone has no deletion time; stamp receipt time.
            record.deleted_at = Some(Timestamp::now());
            feed.deleted.push(record);
        } else {
            feed.contacts.push(entry.record);
        }
    } else {
        tracing::trace!(
            remote_id = ?entry.record.remote_id,
            "dropping entry outside any group"
        );
    }
}

fn parse_feed_link(e: &BytesStart<'_>, feed: &mut ContactFeed) -> Result<(), AtomError> {
    if xml::attr(e, "rel")?.as_deref() == Some("next") {
        feed.next_url = xml::attr(e, "href")?;
    }
    Ok(())
}

fn parse_author<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    feed: &mut ContactFeed,
) -> Result<(), AtomError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"name" | b"atom:name" => {
                    feed.author_name = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"email" | b"atom:email" => {
                    feed.author_email = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                _ => xml::skip_element(reader, e.name().as_ref())?,
            },
            Event::End(ref e) if matches!(e.name().as_ref(), b"author" | b"atom:author") => break,
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

#[expect(clippy::too_many_lines)]
fn parse_entry<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
) -> Result<Entry, AtomError> {
    let mut record = ContactRecord::new();
    record.etag = xml::attr(start, "gd:etag")?.map(VersionTag::new);

    let mut in_group = false;
    let mut deleted = false;
    let mut batch: Option<BatchParts> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let (e, empty) = match event {
            Event::Start(ref e) => (e, false),
            Event::Empty(ref e) => (e, true),
            Event::End(ref e) if matches!(e.name().as_ref(), b"entry" | b"atom:entry") => break,
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {
                buf.clear();
                continue;
            }
        };

        match e.name().as_ref() {
            b"id" | b"atom:id" => {
                if !empty {
                    let id = xml::read_text(reader, e.name().as_ref())?;
                    record.remote_id = id
                        .rsplit('/')
                        .next()
                        .filter(|s| !s.is_empty())
                        .map(RemoteId::from);
                }
            }
            b"updated" | b"app:edited" => {
                if !empty {
                    let text = xml::read_text(reader, e.name().as_ref())?;
                    match text.parse::<Timestamp>() {
                        Ok(ts) => record.updated = Some(ts),
                        Err(_) => tracing::warn!(value = %text, "unparseable entry timestamp"),
                    }
                }
            }
            b"category" | b"atom:category" => {
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gd:name" => {
                if !empty {
                    record.name = Some(parse_name(reader)?);
                }
            }
            b"gd:email" => {
                let address = xml::attr(e, "address")?.unwrap_or_default();
                let context = Context::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                if !address.is_empty() {
                    record.emails.push(Email { address, context });
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gd:phoneNumber" => {
                let rel = xml::attr(e, "rel")?.unwrap_or_default();
                let kind = PhoneKind::from_rel(&rel).unwrap_or_else(|| {
                    tracing::warn!(rel = %rel, "unknown phone kind, downgrading to other");
                    PhoneKind::Other
                });
                let number = if empty {
                    String::new()
                } else {
                    xml::read_text(reader, e.name().as_ref())?
                };
                if !number.is_empty() {
                    record.phones.push(Phone { number, kind });
                }
            }
            b"gd:structuredPostalAddress" => {
                let context = Context::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                let mut address = PostalAddress {
                    context,
                    ..PostalAddress::default()
                };
                if !empty {
                    parse_postal_address(reader, &mut address)?;
                }
                record.addresses.push(address);
            }
            b"gd:organization" => {
                let context = Context::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                let mut org = Organization {
                    context,
                    ..Organization::default()
                };
                if !empty {
                    parse_organization(reader, &mut org)?;
                }
                record.organizations.push(org);
            }
            b"gd:im" => {
                let address = xml::attr(e, "address")?.unwrap_or_default();
                let protocol = ImProtocol::from_wire(&xml::attr(e, "protocol")?.unwrap_or_default());
                let context = Context::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                if !address.is_empty() {
                    record.ims.push(ImHandle {
                        address,
                        protocol,
                        context,
                    });
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gd:extendedProperty" => {
                let name = xml::attr(e, "name")?.unwrap_or_default();
                let value = xml::attr(e, "value")?.unwrap_or_default();
                match name.as_str() {
                    PROP_FAVORITE => record.favorite = Some(value == "true"),
                    PROP_SOUND => record.ringtone = Some(value),
                    "" => {}
                    _ => record.extended.push(ExtendedProperty { name, value }),
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gd:deleted" => {
                deleted = true;
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gContact:birthday" => {
                let when = xml::attr(e, "when")?.unwrap_or_default();
                match when.parse::<Date>() {
                    Ok(date) => record.birthday = Some(date),
                    Err(_) => tracing::warn!(when = %when, "unsupported birthday format"),
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gContact:gender" => {
                let value = xml::attr(e, "value")?.unwrap_or_default();
                record.gender = Gender::from_value(&value);
                if record.gender.is_none() {
                    tracing::warn!(value = %value, "unparseable gender value");
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gContact:hobby" => {
                if !empty {
                    let hobby = xml::read_text(reader, e.name().as_ref())?;
                    if !hobby.is_empty() {
                        record.hobbies.push(hobby);
                    }
                }
            }
            b"gContact:nickname" => {
                if !empty {
                    record.nickname = Some(xml::read_text(reader, e.name().as_ref())?);
                }
            }
            b"gContact:occupation" => {
                if !empty {
                    record.occupation = Some(xml::read_text(reader, e.name().as_ref())?);
                }
            }
            b"gContact:website" => {
                let href = xml::attr(e, "href")?.unwrap_or_default();
                let kind = WebsiteKind::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                if !href.is_empty() {
                    record.websites.push(Website { href, kind });
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"gContact:jot" => {
                let context = Context::from_rel(&xml::attr(e, "rel")?.unwrap_or_default());
                if !empty {
                    let text = xml::read_text(reader, e.name().as_ref())?;
                    if !text.is_empty() {
                        record.notes.push(Note { text, context });
                    }
                }
            }
            b"gContact:event" => parse_event(reader, e, empty, &mut record)?,
            b"gContact:relation" => {
                let rel = xml::attr(e, "rel")?.unwrap_or_default();
                let name = if empty {
                    String::new()
                } else {
                    xml::read_text(reader, e.name().as_ref())?
                };
                match RelationKind::from_rel(&rel) {
                    Some(kind) if !name.is_empty() => {
                        record.relations.push(Relation { kind, name });
                    }
                    Some(_) => {}
                    None => tracing::warn!(rel = %rel, "unsupported relation kind"),
                }
            }
            b"gContact:groupMembershipInfo" => {
                in_group = true;
                if let Some(href) = xml::attr(e, "href")? {
                    if let Some(id) = href.rsplit('/').next() {
                        record.groups.push(id.to_string());
                    }
                }
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"link" | b"atom:link" => {
                let rel = xml::attr(e, "rel")?.unwrap_or_default();
                let etag = xml::attr(e, "gd:etag")?;
                // A photo link without a version tag means the contact has
                // no photo yet.
                if rel == schema::PHOTO_REL && etag.is_some() {
                    record.avatar = Some(Avatar {
                        url: xml::attr(e, "href")?.unwrap_or_default(),
                        etag: etag.map(VersionTag::new),
                    });
                }
                let fragment = xml::capture_element(reader, e, empty)?;
                record.unknown_elements.push(fragment);
            }
            b"batch:id" => {
                if !empty {
                    let id = xml::read_text(reader, e.name().as_ref())?;
                    batch.get_or_insert_with(BatchParts::default).local_id =
                        Some(LocalId::new(id));
                }
            }
            b"batch:operation" => {
                let kind = xml::attr(e, "type")?.as_deref().and_then(BatchKind::from_wire);
                batch.get_or_insert_with(BatchParts::default).kind = kind;
                if !empty {
                    xml::skip_element(reader, e.name().as_ref())?;
                }
            }
            b"batch:status" => {
                let parts = batch.get_or_insert_with(BatchParts::default);
                parts.code = xml::attr(e, "code")?.unwrap_or_default();
                parts.reason = xml::attr(e, "reason")?.unwrap_or_default();
                if !empty {
                    parts.description = xml::read_text(reader, e.name().as_ref())?;
                }
            }
            _ => {
                let fragment = xml::capture_element(reader, e, empty)?;
                record.unknown_elements.push(fragment);
            }
        }
        buf.clear();
    }

    Ok(Entry {
        record,
        in_group,
        deleted,
        batch,
    })
}

fn parse_name<R: std::io::BufRead>(reader: &mut Reader<R>) -> Result<StructuredName, AtomError> {
    let mut name = StructuredName::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"gd:givenName" => {
                    name.given = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:additionalName" => {
                    name.additional = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:familyName" => {
                    name.family = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:namePrefix" => {
                    name.prefix = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:nameSuffix" => {
                    name.suffix = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                _ => xml::skip_element(reader, e.name().as_ref())?,
            },
            Event::End(ref e) if e.name().as_ref() == b"gd:name" => break,
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(name)
}

fn parse_postal_address<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    address: &mut PostalAddress,
) -> Result<(), AtomError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"gd:street" => {
                    address.street = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:pobox" => {
                    address.po_box = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:neighborhood" | b"gd:city" => {
                    address.locality = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:region" => {
                    address.region = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:postcode" => {
                    address.postcode = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:country" => {
                    address.country = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                _ => xml::skip_element(reader, e.name().as_ref())?,
            },
            Event::End(ref e) if e.name().as_ref() == b"gd:structuredPostalAddress" => break,
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_organization<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    org: &mut Organization,
) -> Result<(), AtomError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"gd:orgName" => {
                    org.name = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:orgTitle" => {
                    org.title = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:orgDepartment" => {
                    org.department = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:orgJobDescription" => {
                    org.job_description = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                b"gd:orgSymbol" => {
                    org.symbol = Some(xml::read_text(reader, e.name().as_ref())?);
                }
                _ => xml::skip_element(reader, e.name().as_ref())?,
            },
            Event::End(ref e) if e.name().as_ref() == b"gd:organization" => break,
            Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn parse_event<R: std::io::BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart<'_>,
    empty: bool,
    record: &mut ContactRecord,
) -> Result<(), AtomError> {
    let rel = xml::attr(start, "rel")?.unwrap_or_default();
    if rel != "anniversary" {
        tracing::debug!(rel = %rel, "dropping unsupported event kind");
        if !empty {
            xml::skip_element(reader, start.name().as_ref())?;
        }
        return Ok(());
    }

    let raw_label = xml::attr(start, "label")?.unwrap_or_default();
    let label = EventLabel::from_label(&raw_label).unwrap_or_else(|| {
        tracing::warn!(label = %raw_label, "unknown event label, assuming wedding");
        EventLabel::default()
    });

    let mut date = None;
    let mut description = String::new();
    if !empty {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Empty(ref e) if e.name().as_ref() == b"gd:when" => {
                    if let Some(start_time) = xml::attr(e, "startTime")? {
                        date = parse_event_date(&start_time);
                    }
                    description = xml::attr(e, "valueString")?.unwrap_or_default();
                }
                Event::Start(ref e) if e.name().as_ref() == b"gd:when" => {
                    if let Some(start_time) = xml::attr(e, "startTime")? {
                        date = parse_event_date(&start_time);
                    }
                    description = xml::attr(e, "valueString")?.unwrap_or_default();
                    xml::skip_element(reader, e.name().as_ref())?;
                }
                Event::Start(ref e) => xml::skip_element(reader, e.name().as_ref())?,
                Event::End(ref e) if e.name().as_ref() == b"gContact:event" => break,
                Event::Eof => return Err(AtomError::Xml("unexpected EOF".to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    record.anniversaries.push(Anniversary {
        label,
        date,
        description,
    });
    Ok(())
}

fn parse_event_date(value: &str) -> Option<Date> {
    if let Ok(date) = value.parse::<Date>() {
        return Some(date);
    }
    match value.parse::<Timestamp>() {
        Ok(ts) => Some(ts.to_zoned(TimeZone::UTC).date()),
        Err(_) => {
            tracing::warn!(value = %value, "unparseable event date");
            None
        }
    }
}
