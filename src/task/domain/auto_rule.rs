//! Per-property automation rules that generate tasks around reservations.

use super::{
    AutoRuleId, ParseDomainValueError, PropertyId, ReservationCreated, ReservationStay,
    TaskCategory, TenantId,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reservation anchor a rule is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// Preparation before the guest arrives, anchored on check-in.
    BeforeArrival,
    /// Cleaning after the guest leaves, anchored on check-out.
    AfterDeparture,
    /// Turnover between two stays, anchored on check-out.
    TurnoverBetweenStays,
}

impl TriggerType {
    /// Every trigger a property may configure, one rule each.
    pub const ALL: [Self; 3] = [
        Self::BeforeArrival,
        Self::AfterDeparture,
        Self::TurnoverBetweenStays,
    ];

    /// Returns the instant the rule offset is measured from.
    #[must_use]
    pub const fn anchor(self, stay: &ReservationStay) -> DateTime<Utc> {
        match self {
            Self::BeforeArrival => stay.check_in,
            Self::AfterDeparture | Self::TurnoverBetweenStays => stay.check_out,
        }
    }

    /// Category of the tasks generated by this trigger.
    #[must_use]
    pub const fn category(self) -> TaskCategory {
        match self {
            Self::BeforeArrival | Self::AfterDeparture => TaskCategory::Cleaning,
            Self::TurnoverBetweenStays => TaskCategory::Turnover,
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeArrival => "before_arrival",
            Self::AfterDeparture => "after_departure",
            Self::TurnoverBetweenStays => "turnover_between_stays",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TriggerType {
    type Error = ParseDomainValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|trigger| trigger.as_str() == normalized)
            .ok_or_else(|| ParseDomainValueError::new("trigger type", value))
    }
}

/// Automation rule owned by a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRule {
    /// Rule identifier.
    pub id: AutoRuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Property the rule belongs to.
    pub property_id: PropertyId,
    /// Anchor the rule fires on.
    pub trigger: TriggerType,
    /// Disabled rules never fire.
    pub enabled: bool,
    /// Hours added to the anchor; negative values schedule before it.
    pub offset_hours: i32,
    /// Title template using `{{ placeholder }}` tokens.
    pub title_template: String,
}

impl AutoRule {
    /// Creates an enabled rule with no offset.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        property_id: PropertyId,
        trigger: TriggerType,
        title_template: impl Into<String>,
    ) -> Self {
        Self {
            id: AutoRuleId::new(),
            tenant_id,
            property_id,
            trigger,
            enabled: true,
            offset_hours: 0,
            title_template: title_template.into(),
        }
    }

    /// Sets the anchor offset in hours.
    #[must_use]
    pub const fn with_offset_hours(mut self, offset_hours: i32) -> Self {
        self.offset_hours = offset_hours;
        self
    }

    /// Sets the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Computes the start of the task generated for `stay`.
    #[must_use]
    pub fn scheduled_at(&self, stay: &ReservationStay) -> DateTime<Utc> {
        self.trigger.anchor(stay) + Duration::hours(i64::from(self.offset_hours))
    }
}

/// Placeholder understood by rule title templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateToken {
    /// Display name of the property.
    PropertyName,
    /// Display name of the guest.
    GuestName,
    /// Check-in date.
    CheckIn,
    /// Check-out date.
    CheckOut,
}

const TEMPLATE_TOKENS: [(TemplateToken, &str); 4] = [
    (TemplateToken::PropertyName, "property_name"),
    (TemplateToken::GuestName, "guest_name"),
    (TemplateToken::CheckIn, "check_in"),
    (TemplateToken::CheckOut, "check_out"),
];

impl TemplateToken {
    /// Placeholder name as written inside `{{ }}`.
    #[must_use]
    pub fn placeholder(self) -> &'static str {
        TEMPLATE_TOKENS
            .iter()
            .find(|(token, _)| *token == self)
            .map_or("", |(_, name)| name)
    }

    /// Resolves the token against a reservation.
    #[must_use]
    pub fn resolve(self, reservation: &ReservationCreated) -> String {
        match self {
            Self::PropertyName => reservation.property_name.clone(),
            Self::GuestName => reservation.guest_name.clone(),
            Self::CheckIn => reservation.stay.check_in.format("%Y-%m-%d").to_string(),
            Self::CheckOut => reservation.stay.check_out.format("%Y-%m-%d").to_string(),
        }
    }

    /// Builds the rendering context for every known placeholder.
    #[must_use]
    pub fn context(reservation: &ReservationCreated) -> BTreeMap<&'static str, String> {
        TEMPLATE_TOKENS
            .iter()
            .map(|(token, name)| (*name, token.resolve(reservation)))
            .collect()
    }
}
