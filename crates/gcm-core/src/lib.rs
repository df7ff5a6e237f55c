//! # gcm-core: School Connectivity Model Core
//!
//! Data contracts and primitives shared by the connectivity cost model:
//!
//! - [`UniqueCoordinate`] / [`PairwiseDistance`]: identified points and the
//!   ordered distances between them
//! - [`nearest_distances`]: chunked nearest-k distance computation
//! - [`SingleLookupDistanceCache`] / [`MultiLookupDistanceCache`]: persisted
//!   nearest-distance lookups
//! - [`GigaSchoolTable`] / [`CellTowerTable`]: input tables with validation
//! - [`ScenarioConfig`] and the per-technology cost configurations
//! - [`SchoolConnectionCosts`]: the per-school, per-technology cost record
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gcm_core::*;
//!
//! let schools = vec![UniqueCoordinate::new("school-1", -1.95, 30.06)];
//! let fiber = vec![UniqueCoordinate::new("fiber-1", -1.94, 30.05)];
//!
//! let conf = NearestNeighborConf::defaults().with_neighbors(1);
//! let nearest = nearest_distances(&schools, &fiber, &conf);
//! let cache = SingleLookupDistanceCache::from_distances(nearest);
//! cache.to_json("connected_cache.json").unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod coordinate;
pub mod costs;
pub mod distance;
pub mod error;
pub mod school;

pub use cache::{
    CacheType, GreedyConnectCache, MultiLookupDistanceCache, SingleLookupDistanceCache,
    CONNECTED_CACHE_FILE, UNCONNECTED_CACHE_FILE,
};
pub use config::{
    CellularTechnologyCostConf, CostMinimizerConfig, ElectricityCostConf, FiberCapexConf,
    FiberConstraints, FiberOpexConf, FiberSolver, FiberTechnologyCostConf, FixedCapexConf,
    FixedOpexConf, MinimizerKind, P2PCapexConf, P2PTechnologyCostConf, RangeConstraints,
    SatSolverConfig, SatelliteConstraints, SatelliteTechnologyCostConf, ScenarioConfig,
    TechnologyConfig,
};
pub use coordinate::{UniqueCoordinate, SOURCE_PROPERTY};
pub use costs::{
    CostParts, ElectricityCosts, ElectricitySource, NonConnectionReason, OpexResponsibility,
    SchoolConnectionCosts, Technology,
};
pub use distance::{
    haversine_m, nearest_distances, pairwise_distances, DistanceType, NearestNeighborConf,
    PairwiseDistance, EARTH_RADIUS_M,
};
pub use error::{GcmError, GcmResult};
pub use school::{CellTower, CellTowerTable, GigaSchool, GigaSchoolTable, UniqueCoordinateTable};
