//! Field mapping between satellite records and local meta fields.
//!
//! The satellite API returns camelCase keys while local fields use
//! snake_case. A field table lists which local fields an import may write
//! and how each one resolves against a remote record: an explicit mapping
//! when the names differ in a non-mechanical way, nested extraction for
//! object-valued keys, and a camelCase guess for everything else.

use serde_json::Value as JsonValue;

use super::models::EntityKind;

#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// The remote key holds the value directly.
    Simple {
        api_key: &'static str,
        field: &'static str,
    },
    /// The remote key holds an object; `sub_key` picks a value out of it,
    /// or the whole object is taken when absent.
    Nested {
        api_key: &'static str,
        field: &'static str,
        sub_key: Option<&'static str>,
    },
}

/// Import contract for one entity kind: which remote keys identify and
/// title a record, which local fields may be written, and how they resolve.
pub struct FieldTable {
    /// Local field matching remote records to entries. Listed in `fillable`
    /// for completeness but never written as a meta field.
    pub external_id_field: &'static str,
    /// Remote key holding the display title.
    pub title_field: &'static str,
    /// Remote key holding the record identifier.
    pub id_field: &'static str,
    pub fillable: &'static [&'static str],
    pub rules: &'static [FieldRule],
}

pub const BRAND_FIELD_TABLE: FieldTable = FieldTable {
    external_id_field: "brand_id",
    title_field: "name",
    id_field: "id",
    fillable: &["brand_id", "url", "image", "year_established", "platform"],
    rules: &[FieldRule::Simple {
        api_key: "yearEstablished",
        field: "year_established",
    }],
};

pub const SLOT_FIELD_TABLE: FieldTable = FieldTable {
    external_id_field: "slot_id",
    title_field: "name",
    id_field: "id",
    fillable: &[
        "slot_id",
        "url",
        "image",
        "payout_percentage",
        "rows",
        "reels",
        "paylines",
        "min_bet",
        "max_bet",
        "max_profit",
        "volatility",
        "has_jackpot",
        "has_progressive_slot",
        "has_auto_play",
        "has_bonus_buy",
        "is_mega_ways",
        "has_hold_and_win",
        "software_provider",
    ],
    rules: &[
        FieldRule::Simple {
            api_key: "payoutPercentage",
            field: "payout_percentage",
        },
        FieldRule::Simple {
            api_key: "minBet",
            field: "min_bet",
        },
        FieldRule::Simple {
            api_key: "maxBet",
            field: "max_bet",
        },
        FieldRule::Simple {
            api_key: "maxProfit",
            field: "max_profit",
        },
        FieldRule::Simple {
            api_key: "hasJackpot",
            field: "has_jackpot",
        },
        FieldRule::Simple {
            api_key: "hasProgressiveSlot",
            field: "has_progressive_slot",
        },
        FieldRule::Simple {
            api_key: "hasAutoPlay",
            field: "has_auto_play",
        },
        FieldRule::Simple {
            api_key: "hasBonusBuy",
            field: "has_bonus_buy",
        },
        // the remote key is "isMegaways", which the camelCase guess for
        // is_mega_ways (isMegaWays) would miss
        FieldRule::Simple {
            api_key: "isMegaways",
            field: "is_mega_ways",
        },
        FieldRule::Simple {
            api_key: "hasHoldAndWin",
            field: "has_hold_and_win",
        },
        FieldRule::Nested {
            api_key: "softwareProvider",
            field: "software_provider",
            sub_key: None,
        },
    ],
};

pub fn field_table(kind: EntityKind) -> &'static FieldTable {
    match kind {
        EntityKind::Brand => &BRAND_FIELD_TABLE,
        EntityKind::Slot => &SLOT_FIELD_TABLE,
    }
}

/// Resolves the value for a local field from a remote record.
///
/// Strategies, first match wins:
/// 1. a `Simple` rule for this field whose remote key is present and
///    non-null;
/// 2. a `Nested` rule for this field; terminal even when the remote key is
///    missing, no fallback is attempted;
/// 3. the camelCase guess derived from the field name.
///
/// `None` means "leave the local field untouched".
pub fn resolve_field_value(
    field: &str,
    item: &JsonValue,
    rules: &[FieldRule],
) -> Option<JsonValue> {
    for rule in rules {
        match rule {
            FieldRule::Simple {
                api_key,
                field: mapped,
            } => {
                if *mapped == field {
                    if let Some(value) = item.get(api_key) {
                        if !value.is_null() {
                            return Some(value.clone());
                        }
                    }
                }
            }
            FieldRule::Nested {
                api_key,
                field: mapped,
                sub_key,
            } => {
                if *mapped == field {
                    let value = item.get(api_key)?;
                    let value = match sub_key {
                        Some(sub) => value.get(sub)?,
                        None => value,
                    };
                    if value.is_null() {
                        return None;
                    }
                    return Some(value.clone());
                }
            }
        }
    }
    match item.get(snake_to_camel(field)) {
        Some(value) if !value.is_null() => Some(value.clone()),
        _ => None,
    }
}

fn snake_to_camel(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
