// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The neutral contact representation both sync sides exchange.

use jiff::Timestamp;
use jiff::civil::Date;

use crate::schema::{Context, EventLabel, Gender, ImProtocol, PhoneKind, RelationKind, WebsiteKind};
use crate::types::{LocalId, RemoteId, VersionTag};

/// A contact as both sync sides see it.
///
/// Identity lives in three optional fields. `local_id` is assigned by the
/// local store, `remote_id` by the service on first creation, and `etag`
/// is the service's version tag for optimistic concurrency. A record
/// missing `remote_id` has never existed remotely; a record with
/// `deleted_at` set is a tombstone and carries no detail payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRecord {
    /// Identifier in the local store, if the record has been stored.
    pub local_id: Option<LocalId>,
    /// Identifier on the remote service, if the record exists there.
    pub remote_id: Option<RemoteId>,
    /// Last known version tag of the remote copy.
    pub etag: Option<VersionTag>,
    /// Last modification time reported by the remote service.
    pub updated: Option<Timestamp>,
    /// Deletion time. `Some` marks this record as a tombstone.
    pub deleted_at: Option<Timestamp>,

    /// Structured name.
    pub name: Option<StructuredName>,
    /// Nickname.
    pub nickname: Option<String>,
    /// Gender, where the wire value was parseable.
    pub gender: Option<Gender>,
    /// Birthday.
    pub birthday: Option<Date>,
    /// Occupation free text.
    pub occupation: Option<String>,
    /// Phone numbers.
    pub phones: Vec<Phone>,
    /// Email addresses.
    pub emails: Vec<Email>,
    /// Postal addresses.
    pub addresses: Vec<PostalAddress>,
    /// Website links.
    pub websites: Vec<Website>,
    /// Instant messaging handles.
    pub ims: Vec<ImHandle>,
    /// Organizations.
    pub organizations: Vec<Organization>,
    /// Free-form notes.
    pub notes: Vec<Note>,
    /// Hobbies.
    pub hobbies: Vec<String>,
    /// Anniversary events.
    pub anniversaries: Vec<Anniversary>,
    /// Family relations.
    pub relations: Vec<Relation>,
    /// Ids of the groups this contact belongs to.
    pub groups: Vec<String>,
    /// Whether the contact is starred locally.
    pub favorite: Option<bool>,
    /// Ringtone URL.
    pub ringtone: Option<String>,
    /// Contact photo, with its own version tag.
    pub avatar: Option<Avatar>,
    /// Extended name/value properties.
    pub extended: Vec<ExtendedProperty>,
    /// Raw XML fragments of elements this crate does not model.
    ///
    /// Preserved across a download so a later upload of the same record
    /// does not silently drop server-side data.
    pub unknown_elements: Vec<String>,
}

impl ContactRecord {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tombstone for a contact deleted on the remote side.
    #[must_use]
    pub fn tombstone(remote_id: RemoteId, deleted_at: Timestamp) -> Self {
        Self {
            remote_id: Some(remote_id),
            deleted_at: Some(deleted_at),
            ..Self::default()
        }
    }

    /// Whether this record marks a deletion rather than contact data.
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns a name suitable for logs, falling back through the
    /// structured name parts to the nickname.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            let full = [name.given.as_deref(), name.family.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            if !full.is_empty() {
                return full;
            }
        }
        self.nickname.clone().unwrap_or_default()
    }
}

/// Structured name parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredName {
    /// Given (first) name.
    pub given: Option<String>,
    /// Additional (middle) name.
    pub additional: Option<String>,
    /// Family (last) name.
    pub family: Option<String>,
    /// Honorific prefix.
    pub prefix: Option<String>,
    /// Honorific suffix.
    pub suffix: Option<String>,
}

impl StructuredName {
    /// Whether no part is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.given.is_none()
            && self.additional.is_none()
            && self.family.is_none()
            && self.prefix.is_none()
            && self.suffix.is_none()
    }
}

/// A phone number with its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phone {
    pub number: String,
    pub kind: PhoneKind,
}

/// An email address with its usage context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub address: String,
    pub context: Context,
}

/// A structured postal address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalAddress {
    pub context: Context,
    pub street: Option<String>,
    /// City or neighborhood. The wire format has separate elements for
    /// both; they collapse into this one field on decode.
    pub locality: Option<String>,
    pub po_box: Option<String>,
    pub region: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
}

/// A website link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Website {
    pub href: String,
    pub kind: WebsiteKind,
}

/// An instant messaging handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImHandle {
    pub address: String,
    pub protocol: ImProtocol,
    pub context: Context,
}

/// An organization affiliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Organization {
    pub context: Context,
    pub name: Option<String>,
    pub title: Option<String>,
    pub department: Option<String>,
    pub job_description: Option<String>,
    pub symbol: Option<String>,
}

/// A free-form note with its usage context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    pub text: String,
    pub context: Context,
}

/// An anniversary event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anniversary {
    pub label: EventLabel,
    /// Date of the event, where the wire value was parseable.
    pub date: Option<Date>,
    /// Free-text description of the event.
    pub description: String,
}

/// A family relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    /// Name of the related person.
    pub name: String,
}

/// A contact photo.
///
/// `url` points at the remote photo while the record is in flight; the
/// avatar cache rewrites it to a local file path after download. The
/// version tag changes whenever the photo content changes, which is what
/// lets uploads skip unchanged photos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Avatar {
    pub url: String,
    pub etag: Option<VersionTag>,
}

/// An extended name/value property.
///
/// The wire format allows arbitrary client-defined pairs; a configurable
/// blacklist keeps purely local bookkeeping pairs from being uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedProperty {
    pub name: String,
    pub value: String,
}
