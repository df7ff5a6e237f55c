//! Power supply for the equipment a technology installs at a school.

use gcm_core::{ElectricityCostConf, ElectricityCosts, ElectricitySource, GigaSchool};

const HOURS_PER_YEAR: f64 = 8_760.0;

/// Electricity costs for running `required_power_w` at `school`.
///
/// Grid-connected schools pay for the energy used. Schools without power get
/// a solar installation when new electricity is allowed, otherwise `None`.
pub fn electricity_costs(
    school: &GigaSchool,
    required_power_w: f64,
    conf: &ElectricityCostConf,
) -> Option<ElectricityCosts> {
    if school.has_electricity {
        Some(ElectricityCosts {
            capex: 0.0,
            opex: required_power_w * HOURS_PER_YEAR / 1_000.0 * conf.cost_per_kwh,
            source: ElectricitySource::Existing,
        })
    } else if conf.allow_new_electricity {
        Some(ElectricityCosts {
            capex: required_power_w * conf.solar_cost_per_watt,
            opex: 0.0,
            source: ElectricitySource::Solar,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_supply_pays_energy() {
        let school = GigaSchool::new("s", 0.0, 0.0);
        let costs = electricity_costs(&school, 500.0, &ElectricityCostConf::defaults()).unwrap();
        // 0.5 kW all year at $0.10/kWh
        assert!((costs.opex - 438.0).abs() < 1e-9);
        assert_eq!(costs.capex, 0.0);
        assert_eq!(costs.source, ElectricitySource::Existing);
    }

    #[test]
    fn test_solar_when_allowed() {
        let school = GigaSchool::new("s", 0.0, 0.0).with_electricity(false);
        let costs = electricity_costs(&school, 200.0, &ElectricityCostConf::defaults()).unwrap();
        assert_eq!(costs.capex, 2_000.0);
        assert_eq!(costs.opex, 0.0);
        assert_eq!(costs.source, ElectricitySource::Solar);
    }

    #[test]
    fn test_no_power_when_disallowed() {
        let school = GigaSchool::new("s", 0.0, 0.0).with_electricity(false);
        let conf = ElectricityCostConf {
            allow_new_electricity: false,
            ..ElectricityCostConf::defaults()
        };
        assert!(electricity_costs(&school, 200.0, &conf).is_none());
    }
}
