//! Load campaign bundles from JSON files

use std::fs;
use std::path::Path;

use tracing::info;

use crate::core::error::{EngineError, Result};
use crate::rules::CampaignBundle;

/// Reads and validates a campaign bundle.
pub fn load_campaign(path: &Path) -> Result<CampaignBundle> {
    let content = fs::read_to_string(path)?;
    let bundle = load_campaign_from_str(&content)?;
    info!(
        scenario = %bundle.scenario.name,
        variant = %bundle.variant.name,
        "loaded campaign"
    );
    Ok(bundle)
}

pub fn load_campaign_from_str(content: &str) -> Result<CampaignBundle> {
    let bundle: CampaignBundle = serde_json::from_str(content)?;
    validate(&bundle)?;
    Ok(bundle)
}

fn validate(bundle: &CampaignBundle) -> Result<()> {
    for side in 0..2 {
        let roster = bundle.units.side(side);
        if roster.len() > 64 {
            return Err(EngineError::BadBundle(format!(
                "side {} has {} units, the scheduler addresses at most 64",
                side,
                roster.len()
            )));
        }
        for (i, unit) in roster.iter().enumerate() {
            if unit.index != i || unit.side != side {
                return Err(EngineError::BadBundle(format!(
                    "unit {:?} misfiled at side {} slot {}",
                    unit.name, side, i
                )));
            }
            if unit.supply_unit >= roster.len() {
                return Err(EngineError::BadBundle(format!(
                    "unit {:?} draws supply from missing slot {}",
                    unit.name, unit.supply_unit
                )));
            }
            // Out-of-range general indices are a known anomaly in some
            // scenario data; the engine clamps them at construction.
        }
    }
    if bundle.variant.length_in_days <= 0 {
        return Err(EngineError::BadBundle(
            "variant length must be positive".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::sample::sample_campaign;

    #[test]
    fn test_sample_bundle_round_trips() {
        let bundle = sample_campaign();
        let text = serde_json::to_string(&bundle).unwrap();
        let back = load_campaign_from_str(&text).unwrap();
        assert_eq!(back.scenario.name, bundle.scenario.name);
        assert_eq!(back.units.side(0).len(), bundle.units.side(0).len());
    }

    #[test]
    fn test_misfiled_unit_is_rejected() {
        let mut bundle = sample_campaign();
        bundle.units.units[0][2].index = 5;
        let text = serde_json::to_string(&bundle).unwrap();
        assert!(matches!(
            load_campaign_from_str(&text),
            Err(EngineError::BadBundle(_))
        ));
    }

    #[test]
    fn test_dangling_supply_slot_is_rejected() {
        let mut bundle = sample_campaign();
        bundle.units.units[1][0].supply_unit = 99;
        let text = serde_json::to_string(&bundle).unwrap();
        assert!(load_campaign_from_str(&text).is_err());
    }
}
