//! Field alias registry and value resolution
//!
//! Every valuation attribute is a [`CanonicalField`] with an ordered list of
//! dotted value paths. The same attribute shows up under many historical key
//! names across the extraction pipelines, so resolution tries each path in
//! order, checking extracted data before manual data, and the first present
//! value wins.

mod getters;
mod registry;
mod resolve;

use serde::Serialize;
use serde_json::Value;

use crate::blob::Blob;

pub use registry::{
    field_by_key, fields_with_key, section, section_group, section_groups, sections,
};
pub use resolve::{
    display_value, resolve, resolve_all, resolve_field, resolve_section, Resolution,
    ResolvedField, ValueOrigin, NOT_FOUND_PLACEHOLDER,
};

/// A getter that computes a value instead of walking value paths
///
/// Called with `(extracted, manual)`.
pub type CustomGetter = fn(&Blob, &Blob) -> Option<Value>;

/// How a field is edited in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
}

/// Text explaining to the appraiser where a value comes from
#[derive(Clone, Copy)]
pub enum DataSource {
    Static(&'static str),
    /// Computed from the extracted blob, e.g. to include the extract date
    Computed(fn(&Blob) -> String),
}

impl DataSource {
    pub fn describe(&self, extracted: &Blob) -> String {
        match self {
            Self::Static(text) => (*text).to_string(),
            Self::Computed(f) => f(extracted),
        }
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(text) => write!(f, "Static({:?})", text),
            Self::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

/// One logical attribute of a valuation report
#[derive(Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalField {
    pub key: &'static str,
    pub label: &'static str,
    /// Tried strictly in order; empty only for fields with a custom getter
    pub value_paths: &'static [&'static str],
    #[serde(skip)]
    pub data_source: DataSource,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "no_options")]
    pub options: &'static [&'static str],
    #[serde(skip)]
    pub custom_getter: Option<CustomGetter>,
}

impl CanonicalField {
    /// A plain text field resolved through value paths
    pub const fn text(
        key: &'static str,
        label: &'static str,
        value_paths: &'static [&'static str],
        source: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            value_paths,
            data_source: DataSource::Static(source),
            field_type: FieldType::Text,
            options: &[],
            custom_getter: None,
        }
    }

    /// A field whose value is computed by a getter, bypassing value paths
    pub const fn computed(
        key: &'static str,
        label: &'static str,
        getter: CustomGetter,
        source: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            value_paths: &[],
            data_source: DataSource::Static(source),
            field_type: FieldType::Text,
            options: &[],
            custom_getter: Some(getter),
        }
    }

    pub const fn textarea(mut self) -> Self {
        self.field_type = FieldType::Textarea;
        self
    }

    pub const fn select(mut self, options: &'static [&'static str]) -> Self {
        self.field_type = FieldType::Select;
        self.options = options;
        self
    }

    pub const fn described_by(mut self, describe: fn(&Blob) -> String) -> Self {
        self.data_source = DataSource::Computed(describe);
        self
    }

    pub fn has_custom_getter(&self) -> bool {
        self.custom_getter.is_some()
    }
}

impl std::fmt::Debug for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonicalField")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("value_paths", &self.value_paths)
            .field("field_type", &self.field_type)
            .field("custom_getter", &self.custom_getter.is_some())
            .finish()
    }
}

fn no_options(options: &&'static [&'static str]) -> bool {
    options.is_empty()
}

/// A named group of fields, rendered as one table or form
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SectionConfig {
    pub id: &'static str,
    pub title: &'static str,
    pub fields: &'static [CanonicalField],
}

/// A group of sections shown together (e.g. the land registry table)
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionGroupConfig {
    pub id: &'static str,
    pub title: &'static str,
    pub section_ids: &'static [&'static str],
}
