//! Overlap-driven carriers and disposal areas.
//!
//! A carrier is a player-style inventory with no decision loop of its own.
//! It acts only when an interaction dispatcher announces the zone it is
//! standing in; [`plan`] turns one announcement into at most one action.

use slotmap::SlotMap;

use crate::construction::ConstructionProject;
use crate::dispatch::ZoneRef;
use crate::error::ConfigError;
use crate::id::{ContainerId, DisposalId, ItemTypeId, ProjectId, SourceId, StationId};
use crate::item::Container;
use crate::movement::Position;
use crate::source::ProductSource;
use crate::station::ProcessingStation;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CarrierConfig {
    pub capacity: u32,
}

impl CarrierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity { component: "carrier" });
        }
        Ok(())
    }

    /// Carriers hold any mix of types.
    pub fn make_inventory(&self) -> Container {
        Container::mixed(self.capacity)
    }
}

#[derive(Debug, Clone)]
pub struct Carrier {
    inventory: ContainerId,
}

impl Carrier {
    pub(crate) fn new(inventory: ContainerId) -> Self {
        Self { inventory }
    }

    pub fn inventory(&self) -> ContainerId {
        self.inventory
    }
}

/// Destroys whatever is dropped into it and counts the items.
#[derive(Debug, Clone, Default)]
pub struct Disposal {
    position: Position,
    trashed: u64,
}

impl Disposal {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            trashed: 0,
        }
    }

    pub(crate) fn record(&mut self) {
        self.trashed += 1;
    }

    pub fn trashed(&self) -> u64 {
        self.trashed
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

/// The single action a carrier takes for one announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierAction {
    Nothing,
    /// Take the most recent product from this stockpile.
    Collect { from: ContainerId },
    /// Move one held item of `item_type` into this station input.
    Deliver { to: ContainerId, item_type: ItemTypeId },
    /// Hand one held item of `item_type` to the project.
    Build { project: ProjectId, item_type: ItemTypeId },
    /// Drop the most recent held item into the disposal.
    Trash { disposal: DisposalId },
}

/// Read-only view of the world a carrier plans against.
pub(crate) struct CarrierView<'a> {
    pub containers: &'a SlotMap<ContainerId, Container>,
    pub sources: &'a SlotMap<SourceId, ProductSource>,
    pub stations: &'a SlotMap<StationId, ProcessingStation>,
    pub projects: &'a SlotMap<ProjectId, ConstructionProject>,
    pub disposals: &'a SlotMap<DisposalId, Disposal>,
}

/// Decide what `inventory` does about `zone`. Dangling handles plan nothing.
pub(crate) fn plan(inventory: &Container, zone: ZoneRef, view: &CarrierView<'_>) -> CarrierAction {
    match zone {
        ZoneRef::Source(id) => {
            let Some(source) = view.sources.get(id) else {
                return CarrierAction::Nothing;
            };
            let stocked = view
                .containers
                .get(source.container())
                .is_some_and(|c| !c.is_empty());
            if stocked && inventory.can_accept(source.produced_type()) {
                CarrierAction::Collect {
                    from: source.container(),
                }
            } else {
                CarrierAction::Nothing
            }
        }
        ZoneRef::Sink(id) => {
            let Some(input_id) = view.stations.get(id).and_then(ProcessingStation::input) else {
                return CarrierAction::Nothing;
            };
            let Some(input) = view.containers.get(input_id) else {
                return CarrierAction::Nothing;
            };
            match input.type_lock() {
                Some(required) if inventory.contains_type(required) && input.can_accept(required) => {
                    CarrierAction::Deliver {
                        to: input_id,
                        item_type: required,
                    }
                }
                _ => CarrierAction::Nothing,
            }
        }
        ZoneRef::Construction(id) => {
            let needed = view
                .projects
                .get(id)
                .filter(|p| p.is_active())
                .and_then(ConstructionProject::next_required_type);
            match needed {
                Some(item_type) if inventory.contains_type(item_type) => CarrierAction::Build {
                    project: id,
                    item_type,
                },
                _ => CarrierAction::Nothing,
            }
        }
        ZoneRef::Disposal(id) => {
            if view.disposals.contains_key(id) && !inventory.is_empty() {
                CarrierAction::Trash { disposal: id }
            } else {
                CarrierAction::Nothing
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::construction::ProjectConfig;
    use crate::item::ItemMint;
    use crate::source::SourceConfig;
    use crate::station::StationConfig;

    const A: ItemTypeId = ItemTypeId(0);
    const B: ItemTypeId = ItemTypeId(1);

    #[derive(Default)]
    struct World {
        containers: SlotMap<ContainerId, Container>,
        sources: SlotMap<SourceId, ProductSource>,
        stations: SlotMap<StationId, ProcessingStation>,
        projects: SlotMap<ProjectId, ConstructionProject>,
        disposals: SlotMap<DisposalId, Disposal>,
        mint: ItemMint,
    }

    impl World {
        fn view(&self) -> CarrierView<'_> {
            CarrierView {
                containers: &self.containers,
                sources: &self.sources,
                stations: &self.stations,
                projects: &self.projects,
                disposals: &self.disposals,
            }
        }

        fn holding(&mut self, types: &[ItemTypeId]) -> Container {
            let mut inv = CarrierConfig { capacity: 3 }.make_inventory();
            for &ty in types {
                inv.try_add(self.mint.mint(ty)).unwrap();
            }
            inv
        }
    }

    #[test]
    fn collects_from_stocked_source() {
        let mut w = World::default();
        let config = SourceConfig::new(A, 5, 1);
        let pile = w.containers.insert(config.make_container());
        let source = w.sources.insert(ProductSource::new(&config, pile));
        let inv = w.holding(&[B]);

        assert_eq!(plan(&inv, ZoneRef::Source(source), &w.view()), CarrierAction::Nothing);
        w.containers[pile].try_add(w.mint.mint(A)).unwrap();
        assert_eq!(
            plan(&inv, ZoneRef::Source(source), &w.view()),
            CarrierAction::Collect { from: pile }
        );

        let full = w.holding(&[B, B, B]);
        assert_eq!(plan(&full, ZoneRef::Source(source), &w.view()), CarrierAction::Nothing);
    }

    #[test]
    fn delivers_only_the_required_type() {
        let mut w = World::default();
        let out_config = SourceConfig::new(B, 5, 1);
        let out_pile = w.containers.insert(out_config.make_container());
        let out = w.sources.insert(ProductSource::new(&out_config, out_pile));
        let input = w.containers.insert(Container::fixed(2, A));
        let station = w
            .stations
            .insert(ProcessingStation::new(StationConfig::new(input, out, 1)));

        let inv = w.holding(&[B]);
        assert_eq!(plan(&inv, ZoneRef::Sink(station), &w.view()), CarrierAction::Nothing);

        let inv = w.holding(&[A, B]);
        assert_eq!(
            plan(&inv, ZoneRef::Sink(station), &w.view()),
            CarrierAction::Deliver { to: input, item_type: A }
        );
    }

    #[test]
    fn builds_with_next_required_type() {
        let mut w = World::default();
        let project = w
            .projects
            .insert(ConstructionProject::new(ProjectConfig::new(vec![B, A], 1)));
        let inv = w.holding(&[A]);
        assert_eq!(plan(&inv, ZoneRef::Construction(project), &w.view()), CarrierAction::Nothing);

        let inv = w.holding(&[A, B]);
        assert_eq!(
            plan(&inv, ZoneRef::Construction(project), &w.view()),
            CarrierAction::Build { project, item_type: B }
        );
    }

    #[test]
    fn trashes_anything() {
        let mut w = World::default();
        let disposal = w.disposals.insert(Disposal::default());
        let empty = w.holding(&[]);
        assert_eq!(plan(&empty, ZoneRef::Disposal(disposal), &w.view()), CarrierAction::Nothing);
        let inv = w.holding(&[B]);
        assert_eq!(
            plan(&inv, ZoneRef::Disposal(disposal), &w.view()),
            CarrierAction::Trash { disposal }
        );
    }
}
