//! Bank denomination metadata.
//!
//! A denomination is described by its base unit (exponent 0, the unit ledger
//! amounts are counted in) and any number of larger units. The `display` unit
//! is the one wallets show, and its exponent fixes how many base units make up
//! one display unit.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdError, StdResult};

/// Maximum denomination length accepted by the bank module
pub const MAX_DENOM_LEN: usize = 128;

/// A single unit of a denomination
#[cw_serde]
pub struct DenomUnit {
    /// Unit name (e.g. "uosmo", "osmo")
    pub denom: String,
    /// Power of ten relative to the base unit
    pub exponent: u32,
    /// Alternative names for this unit
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Bank metadata for a denomination
#[cw_serde]
pub struct Metadata {
    pub description: String,
    /// Units in ascending exponent order; the first one is the base unit
    pub denom_units: Vec<DenomUnit>,
    /// Base denomination (exponent 0)
    pub base: String,
    /// Display denomination
    pub display: String,
    pub name: String,
    pub symbol: String,
}

impl Metadata {
    /// Validate the metadata structure.
    ///
    /// The base unit must be listed first with exponent 0, exponents must be
    /// strictly increasing and the display unit must be one of the units.
    pub fn validate(&self) -> StdResult<()> {
        validate_denom(&self.base)?;
        validate_denom(&self.display)?;

        if self.name.trim().is_empty() {
            return Err(StdError::generic_err("metadata name cannot be blank"));
        }
        if self.symbol.trim().is_empty() {
            return Err(StdError::generic_err("metadata symbol cannot be blank"));
        }

        let base_unit = self
            .denom_units
            .first()
            .ok_or_else(|| StdError::generic_err("metadata must contain at least one unit"))?;
        if base_unit.denom != self.base {
            return Err(StdError::generic_err(format!(
                "first denomination unit {} must be the base denom {}",
                base_unit.denom, self.base
            )));
        }
        if base_unit.exponent != 0 {
            return Err(StdError::generic_err(format!(
                "base denomination unit {} must have exponent 0, got {}",
                base_unit.denom, base_unit.exponent
            )));
        }

        for window in self.denom_units.windows(2) {
            if window[1].exponent <= window[0].exponent {
                return Err(StdError::generic_err(format!(
                    "denom units must be sorted by strictly increasing exponent: {} ({}) after {} ({})",
                    window[1].denom, window[1].exponent, window[0].denom, window[0].exponent
                )));
            }
        }

        if self.display_exponent().is_none() {
            return Err(StdError::generic_err(format!(
                "display denom {} is not one of the denomination units",
                self.display
            )));
        }

        Ok(())
    }

    /// Exponent of the display unit, if it is listed
    pub fn display_exponent(&self) -> Option<u32> {
        self.denom_units
            .iter()
            .find(|unit| unit.denom == self.display)
            .map(|unit| unit.exponent)
    }
}

/// Validate a denomination string.
///
/// Mirrors the bank module rule: a letter followed by 2-127 characters from
/// `[a-zA-Z0-9/:._-]`.
pub fn validate_denom(denom: &str) -> StdResult<()> {
    let mut chars = denom.chars();
    let first = chars
        .next()
        .ok_or_else(|| StdError::generic_err("denom cannot be empty"))?;

    if !first.is_ascii_alphabetic() {
        return Err(StdError::generic_err(format!(
            "invalid denom {}: must start with a letter",
            denom
        )));
    }
    if denom.len() < 3 || denom.len() > MAX_DENOM_LEN {
        return Err(StdError::generic_err(format!(
            "invalid denom {}: length must be between 3 and {}",
            denom, MAX_DENOM_LEN
        )));
    }
    if let Some(c) = chars.find(|c| !(c.is_ascii_alphanumeric() || "/:._-".contains(*c))) {
        return Err(StdError::generic_err(format!(
            "invalid denom {}: unexpected character {:?}",
            denom, c
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osmo_metadata() -> Metadata {
        Metadata {
            description: "Osmosis".to_string(),
            denom_units: vec![
                DenomUnit {
                    denom: "uosmo".to_string(),
                    exponent: 0,
                    aliases: vec![],
                },
                DenomUnit {
                    denom: "osmo".to_string(),
                    exponent: 6,
                    aliases: vec![],
                },
            ],
            base: "uosmo".to_string(),
            display: "osmo".to_string(),
            name: "Osmosis".to_string(),
            symbol: "OSMO".to_string(),
        }
    }

    #[test]
    fn test_valid_metadata() {
        let metadata = osmo_metadata();
        assert!(metadata.validate().is_ok());
        assert_eq!(metadata.display_exponent(), Some(6));
    }

    #[test]
    fn test_base_unit_must_come_first() {
        let mut metadata = osmo_metadata();
        metadata.denom_units.reverse();
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_base_unit_exponent_must_be_zero() {
        let mut metadata = osmo_metadata();
        metadata.denom_units[0].exponent = 1;
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_display_must_be_listed() {
        let mut metadata = osmo_metadata();
        metadata.display = "mosmo".to_string();
        assert!(metadata.validate().is_err());
    }

    #[test]
    fn test_validate_denom() {
        assert!(validate_denom("uosmo").is_ok());
        assert!(validate_denom("u/osmo").is_ok());
        assert!(validate_denom("ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2").is_ok());
        assert!(validate_denom("").is_err());
        assert!(validate_denom("1osmo").is_err());
        assert!(validate_denom("os").is_err());
        assert!(validate_denom("u osmo").is_err());
    }
}
