//! Card form state and the reducer that drives it.
//!
//! A [`CardForm`] is an immutable record. Every edit goes through [`reduce`],
//! which returns the next state plus whether the edit was taken. Edits that
//! break a field limit (too long, non-digit years) are refused at the input
//! boundary: the previous state comes back unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The three card variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Birthday,
    Anniversary,
    Onboarding,
}

impl CardKind {
    pub const ALL: [CardKind; 3] = [CardKind::Birthday, CardKind::Anniversary, CardKind::Onboarding];

    /// Stage id of the rendered card element.
    pub fn element_id(self) -> &'static str {
        match self {
            CardKind::Birthday => "birthday-card",
            CardKind::Anniversary => "anniversary-card",
            CardKind::Onboarding => "onboarding-card",
        }
    }

    /// Prefix of the downloaded file name.
    pub fn file_prefix(self) -> &'static str {
        match self {
            CardKind::Birthday => "birthday",
            CardKind::Anniversary => "anniversary",
            CardKind::Onboarding => "welcome",
        }
    }

    /// Text fields the card exposes, in form order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            CardKind::Birthday => &[Field::Name],
            CardKind::Anniversary => &[Field::Name, Field::YearsOfService, Field::Designation],
            CardKind::Onboarding => &[
                Field::Name,
                Field::Designation,
                Field::Email,
                Field::Phone,
                Field::Education,
                Field::Location,
                Field::WelcomeMessage,
                Field::ReportingManager,
                Field::ManagerMessage,
            ],
        }
    }

    /// Fields that must be non-empty before the card can be downloaded.
    pub fn required_fields(self) -> &'static [Field] {
        match self {
            CardKind::Birthday => &[Field::Name],
            CardKind::Anniversary => &[Field::Name, Field::Designation],
            CardKind::Onboarding => &[Field::Name],
        }
    }

    pub fn supports_images(self) -> bool {
        matches!(self, CardKind::Onboarding)
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CardKind::Birthday => "birthday",
            CardKind::Anniversary => "anniversary",
            CardKind::Onboarding => "onboarding",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for CardKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "birthday" => Ok(CardKind::Birthday),
            "anniversary" => Ok(CardKind::Anniversary),
            "onboarding" | "welcome" => Ok(CardKind::Onboarding),
            other => Err(crate::Error::ConfigError(format!("unknown card kind: {}", other))),
        }
    }
}

/// Named text fields across all card kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Designation,
    YearsOfService,
    Location,
    Email,
    Phone,
    Education,
    WelcomeMessage,
    ReportingManager,
    ManagerMessage,
}

impl Field {
    /// Maximum length in characters, if the field is bounded.
    pub fn max_chars(self, kind: CardKind) -> Option<usize> {
        match (self, kind) {
            (Field::Name, _) => Some(30),
            (Field::YearsOfService, _) => Some(2),
            (Field::Designation, CardKind::Anniversary) => Some(50),
            _ => None,
        }
    }

    /// Whether `value` is acceptable for this field on a `kind` card.
    pub fn accepts(self, kind: CardKind, value: &str) -> bool {
        if let Some(max) = self.max_chars(kind) {
            if value.chars().count() > max {
                return false;
            }
        }
        match self {
            Field::YearsOfService => value.bytes().all(|b| b.is_ascii_digit()),
            _ => true,
        }
    }
}

/// The two optional image payloads of an onboarding card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    User,
    Manager,
}

/// One edit to a form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    SetText(Field, String),
    SetImage(ImageSlot, Option<String>),
}

/// Whether [`reduce`] took the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Accepted,
    Rejected,
}

/// Immutable form state for one card editing session.
///
/// Image payloads are opaque strings: either a `data:` URL (an uploaded or
/// fetched photo) or a remote URL that has not been loaded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CardForm {
    kind: CardKind,
    fields: BTreeMap<Field, String>,
    user_image: Option<String>,
    manager_image: Option<String>,
}

impl CardForm {
    /// A fresh form with every field empty.
    pub fn new(kind: CardKind) -> Self {
        let fields = kind.fields().iter().map(|f| (*f, String::new())).collect();
        Self {
            kind,
            fields,
            user_image: None,
            manager_image: None,
        }
    }

    pub fn kind(&self) -> CardKind {
        self.kind
    }

    /// Current value of `field`; empty for fields the card doesn't have.
    pub fn get(&self, field: Field) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or("")
    }

    pub fn image(&self, slot: ImageSlot) -> Option<&str> {
        match slot {
            ImageSlot::User => self.user_image.as_deref(),
            ImageSlot::Manager => self.manager_image.as_deref(),
        }
    }

    /// True when every required field is non-empty.
    pub fn can_download(&self) -> bool {
        self.kind().required_fields().iter().all(|f| !self.get(*f).is_empty())
    }

    /// `{prefix}-{name}`, without extension.
    pub fn file_base_name(&self) -> String {
        format!("{}-{}", self.kind().file_prefix(), self.get(Field::Name))
    }
}

/// Pure reducer: the next state for `action`, or the same state when refused.
pub fn reduce(state: &CardForm, action: FormAction) -> (CardForm, Applied) {
    let kind = state.kind();
    match action {
        FormAction::SetText(field, value) => {
            if !state.fields.contains_key(&field) || !field.accepts(kind, &value) {
                return (state.clone(), Applied::Rejected);
            }
            let mut next = state.clone();
            next.fields.insert(field, value);
            (next, Applied::Accepted)
        }
        FormAction::SetImage(slot, payload) => {
            if !kind.supports_images() {
                return (state.clone(), Applied::Rejected);
            }
            let mut next = state.clone();
            match slot {
                ImageSlot::User => next.user_image = payload,
                ImageSlot::Manager => next.manager_image = payload,
            }
            (next, Applied::Accepted)
        }
    }
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, ...
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
