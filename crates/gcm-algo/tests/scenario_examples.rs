//! End-to-end scenarios through the public API.

use gcm_algo::{
    ConstrainedEconomiesOfScaleMinimizer, CostMinimizer, CostResultSpace, LifetimeCost, MinimumCostScenario,
    OutputSpace, ScenarioData, ScenarioSummary,
};
use gcm_core::{
    CellTowerTable, CostParts, FiberTechnologyCostConf, GigaSchool, GigaSchoolTable, NonConnectionReason,
    OpexResponsibility, PairwiseDistance, SatelliteTechnologyCostConf, ScenarioConfig, SchoolConnectionCosts,
    Technology, TechnologyConfig, UniqueCoordinate, UniqueCoordinateTable, EARTH_RADIUS_M, SOURCE_PROPERTY,
};

/// Point `x_km` east of (0, 0) along the equator.
fn at_km(id: &str, x_km: f64) -> UniqueCoordinate {
    UniqueCoordinate::new(id, 0.0, (x_km * 1000.0 / EARTH_RADIUS_M).to_degrees())
}

fn school_at_km(id: &str, x_km: f64) -> GigaSchool {
    let c = at_km(id, x_km);
    GigaSchool::new(id, c.lat(), c.lon())
}

fn cheap_fiber() -> FiberTechnologyCostConf {
    let mut conf = FiberTechnologyCostConf::defaults();
    conf.capex.cost_per_km = 10.0;
    conf.capex.fixed_costs = 0.0;
    conf
}

fn result_for<'a>(output: &'a OutputSpace, id: &str) -> &'a SchoolConnectionCosts {
    output
        .minimum_cost_result
        .iter()
        .find(|c| c.school_id == id)
        .unwrap_or_else(|| panic!("no result for {id}"))
}

#[test]
fn fiber_only_scenario_connects_school_in_range() {
    let data = ScenarioData::new(
        GigaSchoolTable::new(vec![
            school_at_km("A", 2.0),
            school_at_km("B", 40.0),
            school_at_km("C", -40.0),
        ]),
        UniqueCoordinateTable::new(vec![at_km("F", 0.0)]),
        CellTowerTable::default(),
    );
    let config = ScenarioConfig::defaults().with_technologies(vec![TechnologyConfig::Fiber(cheap_fiber())]);
    let output = MinimumCostScenario::new(config, data).unwrap().run().unwrap();

    let a = result_for(&output, "A");
    assert!(a.feasible);
    assert_eq!(a.technology, Some(Technology::Fiber));
    assert!((a.capex - 20.0).abs() < 1e-6, "capex {}", a.capex);
    for id in ["B", "C"] {
        let c = result_for(&output, id);
        assert!(!c.feasible);
        assert_eq!(c.reason(), Some(NonConnectionReason::FiberDistanceThreshold));
    }

    let fiber = output.get(Technology::Fiber).unwrap();
    assert_eq!(fiber.distances.len(), 1);
    assert_eq!(fiber.distances[0].first_id(), "F");
}

#[test]
fn every_school_gets_exactly_one_result() {
    let data = ScenarioData::new(
        GigaSchoolTable::new(vec![
            school_at_km("near", 1.0),
            school_at_km("mid", 15.0),
            school_at_km("far", 300.0),
            school_at_km("dark", 3.0).with_electricity(false),
        ]),
        UniqueCoordinateTable::new(vec![at_km("F", 0.0)]),
        CellTowerTable::default(),
    );
    let config = ScenarioConfig::defaults().with_technologies(vec![
        TechnologyConfig::Fiber(cheap_fiber()),
        TechnologyConfig::Satellite(SatelliteTechnologyCostConf::defaults()),
    ]);
    let output = MinimumCostScenario::new(config, data).unwrap().run().unwrap();

    let mut ids: Vec<&str> = output.minimum_cost_result.iter().map(|c| c.school_id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["dark", "far", "mid", "near"]);
    assert_eq!(result_for(&output, "far").technology, Some(Technology::Satellite));

    let summary = ScenarioSummary::from_output(&output);
    assert_eq!(summary.schools, 4);
    assert_eq!(summary.connected + summary.infeasible, 4);
}

fn edge(from: &str, to: &str) -> PairwiseDistance {
    PairwiseDistance::new(
        UniqueCoordinate::new(from, 0.0, 0.0).with_property(SOURCE_PROPERTY, "F"),
        UniqueCoordinate::new(to, 0.0, 0.0).with_property(SOURCE_PROPERTY, "F"),
        1_000.0,
        Default::default(),
    )
}

fn capex(id: &str, technology: Technology, amount: f64) -> SchoolConnectionCosts {
    let parts = CostParts {
        capex_provider: amount,
        ..CostParts::default()
    };
    SchoolConnectionCosts::connected(id, technology, parts, None)
}

#[test]
fn budget_caps_cluster_spending() {
    // a $150k fiber chain F -> s1 -> s2 -> s3 against $60k satellite links
    let ids = ["s1", "s2", "s3"];
    let mut output = OutputSpace::new();
    output.insert(CostResultSpace::new(
        Technology::Fiber,
        vec![edge("F", "s1"), edge("s1", "s2"), edge("s2", "s3")],
        ids.iter().map(|id| capex(id, Technology::Fiber, 50_000.0)).collect(),
    ));
    output.insert(CostResultSpace::new(
        Technology::Satellite,
        Vec::new(),
        ids.iter().map(|id| capex(id, Technology::Satellite, 60_000.0)).collect(),
    ));
    output.aggregate();

    let lifetime = LifetimeCost::new(5, OpexResponsibility::Consumer);
    let result = ConstrainedEconomiesOfScaleMinimizer::new(lifetime, 100_000.0)
        .minimize(&output)
        .unwrap();

    let spent: f64 = result.costs.iter().filter(|c| c.feasible).map(|c| c.capex).sum();
    assert!(spent <= 100_000.0, "spent {spent}");
    assert_eq!(spent, 100_000.0);
    assert_eq!(result.costs[0].technology, Some(Technology::Fiber));
    assert_eq!(result.costs[1].technology, Some(Technology::Fiber));
    assert_eq!(result.costs[2].reason(), Some(NonConnectionReason::BudgetExceeded));
    assert_eq!(result.fiber_distances.unwrap().len(), 2);
}

#[test]
fn budgeted_scenario_never_overspends() {
    let schools: Vec<GigaSchool> = (1..=6).map(|i| school_at_km(&format!("s{i}"), i as f64 * 3.0)).collect();
    let data = ScenarioData::new(
        GigaSchoolTable::new(schools),
        UniqueCoordinateTable::new(vec![at_km("F", 0.0)]),
        CellTowerTable::default(),
    );
    let mut config = ScenarioConfig::defaults().with_technologies(vec![
        TechnologyConfig::Fiber(FiberTechnologyCostConf::defaults()),
        TechnologyConfig::Satellite(SatelliteTechnologyCostConf::defaults()),
    ]);
    config.cost_minimizer.budget_constraint = Some(60_000.0);
    let years = config.cost_minimizer.years_opex;
    let responsibility = config.cost_minimizer.opex_responsible;

    let output = MinimumCostScenario::new(config, data).unwrap().run().unwrap();
    let lifetime: f64 = output
        .minimum_cost_result
        .iter()
        .filter(|c| c.feasible)
        .map(|c| c.lifetime_cost(years, responsibility))
        .sum();
    assert!(lifetime <= 60_000.0 + 1e-6, "lifetime spend {lifetime}");
    assert_eq!(output.minimum_cost_result.len(), 6);
}
