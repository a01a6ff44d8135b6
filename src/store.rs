//! Indexed collection of decoded entities. A file only ever
//! shows a partial, possibly stale view of the universe; the store ingests
//! many files' worth of records and keeps the provenance of each so a
//! later merge (see [`crate::merge`]) can decide which record wins when
//! two files disagree about the same entity.

use std::collections::BTreeMap;

use crate::blocks::fleet::FleetBlock;
use crate::blocks::design::DesignBlock;
use crate::blocks::orders::WaypointBlock;
use crate::blocks::planet::PlanetBlock;
use crate::blocks::player::{PlayerBlock, PlayerScoresBlock};
use crate::blocks::objects::ObjectRecordBlock;
use crate::framer::FileTypeTag;

/// Where a given entity snapshot came from, and how much to trust it
/// relative to a same-entity snapshot from a different file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provenance {
    pub file_type: FileTypeTag,
    pub turn: u16,
    pub player_index: u8,
}

#[derive(Debug, Clone)]
pub struct PlayerEntity {
    pub block: PlayerBlock,
    pub provenance: Provenance,
    /// Derived tallies kept in sync with the store's own design/fleet
    /// tables on every ingest — the field-level counterpart to I4
    /// (`player.ship_design_count == |{designs: owner=player, not
    /// starbase}|`, similarly for starbases and fleets), since the wire
    /// scoreboard record carries no such field of its own.
    pub counts: PlayerCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerCounts {
    pub ship_design_count: u16,
    pub starbase_design_count: u16,
    pub fleet_count: u16,
}

#[derive(Debug, Clone)]
pub struct PlayerScoresEntity {
    pub block: PlayerScoresBlock,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct PlanetEntity {
    pub block: PlanetBlock,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct FleetEntity {
    pub block: FleetBlock,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct DesignEntity {
    pub block: DesignBlock,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct WaypointEntity {
    pub block: WaypointBlock,
    pub provenance: Provenance,
}

#[derive(Debug, Clone)]
pub struct ObjectEntity {
    pub block: ObjectRecordBlock,
    pub provenance: Provenance,
}

/// Keyed collection of every entity type this crate decodes, ingested
/// across however many files the caller has fed it.
/// A fleet's identity: a fleet number alone is only unique within
/// its owner, so two different players' files can legally report a fleet
/// 3 that are unrelated entities.
pub type FleetKey = (u8, u16);

/// A design's identity: a design slot is only unique within its
/// owner and within the ship/starbase slot range, so the same slot number
/// can simultaneously name a ship design and a starbase design.
pub type DesignKey = (u8, bool, u8);

#[derive(Debug, Clone, Default)]
pub struct GameStateStore {
    players: BTreeMap<u8, PlayerEntity>,
    player_scores: BTreeMap<u8, PlayerScoresEntity>,
    planets: BTreeMap<u16, PlanetEntity>,
    fleets: BTreeMap<FleetKey, FleetEntity>,
    designs: BTreeMap<DesignKey, DesignEntity>,
    /// Waypoints are per-fleet sequences, not single values, so they're
    /// keyed by owning fleet and appended in ingestion order.
    waypoints: BTreeMap<FleetKey, Vec<WaypointEntity>>,
    objects: BTreeMap<u16, ObjectEntity>,
}

impl GameStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest_player(&mut self, block: PlayerBlock, provenance: Provenance) {
        let id = block.player_id;
        self.players.insert(
            id,
            PlayerEntity {
                block,
                provenance,
                counts: PlayerCounts::default(),
            },
        );
        self.recompute_counts_for(id);
    }

    pub fn ingest_player_scores(&mut self, block: PlayerScoresBlock, provenance: Provenance) {
        let id = block.player_id;
        self.player_scores
            .insert(id, PlayerScoresEntity { block, provenance });
    }

    pub fn player_scores(&self, id: u8) -> Option<&PlayerScoresEntity> {
        self.player_scores.get(&id)
    }

    pub fn ingest_planet(&mut self, block: PlanetBlock, provenance: Provenance) {
        let id = block.planet_id;
        self.planets.insert(id, PlanetEntity { block, provenance });
    }

    pub fn ingest_fleet(&mut self, block: FleetBlock, provenance: Provenance) {
        let key = (block.owner_id, block.fleet_id);
        let owner = block.owner_id;
        self.fleets.insert(key, FleetEntity { block, provenance });
        self.recompute_counts_for(owner);
    }

    pub fn ingest_design(&mut self, block: DesignBlock, provenance: Provenance) {
        let key = (block.owner_id, block.is_starbase, block.design_id);
        let owner = block.owner_id;
        self.designs.insert(key, DesignEntity { block, provenance });
        self.recompute_counts_for(owner);
    }

    /// Recomputes `player_id`'s design/fleet tallies from the store's
    /// current design and fleet tables. A no-op if no player record with
    /// this id has been ingested yet — the counts are attached to the
    /// player entity, so there's nowhere to park them until it exists.
    fn recompute_counts_for(&mut self, player_id: u8) {
        let ship_design_count = self
            .designs
            .values()
            .filter(|d| d.block.owner_id == player_id && !d.block.is_starbase)
            .count() as u16;
        let starbase_design_count = self
            .designs
            .values()
            .filter(|d| d.block.owner_id == player_id && d.block.is_starbase)
            .count() as u16;
        let fleet_count = self
            .fleets
            .values()
            .filter(|f| f.block.owner_id == player_id)
            .count() as u16;
        if let Some(entity) = self.players.get_mut(&player_id) {
            entity.counts = PlayerCounts {
                ship_design_count,
                starbase_design_count,
                fleet_count,
            };
        }
    }

    /// A waypoint order carries no owner field of its own — it's always
    /// submitted by a player about one of their own fleets, so the
    /// submitting file's player index (from `provenance`) stands in for
    /// the fleet's owner in the composite key.
    pub fn ingest_waypoint(&mut self, block: WaypointBlock, provenance: Provenance) {
        let key = (provenance.player_index, block.fleet_id);
        self.waypoints
            .entry(key)
            .or_default()
            .push(WaypointEntity { block, provenance });
    }

    pub fn ingest_object(&mut self, id: u16, block: ObjectRecordBlock, provenance: Provenance) {
        self.objects.insert(id, ObjectEntity { block, provenance });
    }

    pub fn player(&self, id: u8) -> Option<&PlayerEntity> {
        self.players.get(&id)
    }

    pub fn planet(&self, id: u16) -> Option<&PlanetEntity> {
        self.planets.get(&id)
    }

    pub fn fleet(&self, key: FleetKey) -> Option<&FleetEntity> {
        self.fleets.get(&key)
    }

    pub fn design(&self, key: DesignKey) -> Option<&DesignEntity> {
        self.designs.get(&key)
    }

    pub fn waypoints_for_fleet(&self, owner_id: u8, fleet_id: u16) -> &[WaypointEntity] {
        self.waypoints
            .get(&(owner_id, fleet_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn object(&self, id: u16) -> Option<&ObjectEntity> {
        self.objects.get(&id)
    }

    pub fn planets(&self) -> impl Iterator<Item = &PlanetEntity> {
        self.planets.values()
    }

    pub fn fleets(&self) -> impl Iterator<Item = &FleetEntity> {
        self.fleets.values()
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.players.values()
    }

    pub fn designs(&self) -> impl Iterator<Item = &DesignEntity> {
        self.designs.values()
    }

    pub fn objects(&self) -> impl Iterator<Item = (&u16, &ObjectEntity)> {
        self.objects.iter()
    }

    /// Planets owned by `player_id`, per the owner field recorded on each
    /// planet's most recent ingested snapshot.
    pub fn planets_owned_by(&self, player_id: u8) -> impl Iterator<Item = &PlanetEntity> {
        self.planets
            .values()
            .filter(move |entity| entity.block.owner_id == Some(player_id))
    }

    /// Fleets owned by `player_id`.
    pub fn fleets_owned_by(&self, player_id: u8) -> impl Iterator<Item = &FleetEntity> {
        self.fleets
            .values()
            .filter(move |entity| entity.block.owner_id == player_id)
    }

    /// A flat, serializable summary of every planet currently held, for
    /// handoff to tooling outside this crate (a map renderer, a diff
    /// viewer) that has no reason to link against the block catalog types
    /// directly.
    pub fn planet_summaries(&self) -> Vec<PlanetSummary> {
        self.planets
            .values()
            .map(|entity| PlanetSummary {
                planet_id: entity.block.planet_id,
                owner_id: entity.block.owner_id,
                detection_level: entity.block.detection_level,
                last_seen_turn: entity.provenance.turn,
            })
            .collect()
    }

    /// Serializes [`Self::planet_summaries`] to JSON.
    pub fn planet_summaries_json(&self) -> Result<String, crate::error::CoreError> {
        serde_json::to_string(&self.planet_summaries())
            .map_err(|err| crate::error::CoreError::io(std::io::Error::new(std::io::ErrorKind::Other, err)))
    }
}

/// JSON-friendly projection of a planet entity. Deliberately
/// narrower than [`PlanetBlock`] — callers that need the full record still
/// go through [`GameStateStore::planet`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlanetSummary {
    pub planet_id: u16,
    pub owner_id: Option<u8>,
    pub detection_level: u8,
    pub last_seen_turn: u16,
}

/// Visibility predicates over a single decoded planet record:
/// whether the detecting player's file recorded enough to answer each
/// question, independent of whether the store currently holds a fresher
/// snapshot from elsewhere. Each tracks the presence of the wire section
/// that carries the answer, rather than re-deriving it from
/// `detection_level` alone — a planet can be owner-known or starbase-known
/// independent of environment scan quality.
pub fn can_see_minerals(planet: &PlanetBlock) -> bool {
    planet.environment.is_some()
}

pub fn can_see_population(planet: &PlanetBlock) -> bool {
    planet.surface_minerals.is_some()
}

pub fn can_see_starbase(planet: &PlanetBlock) -> bool {
    planet.starbase.is_some()
}

#[cfg(test)]
mod test {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            file_type: FileTypeTag::HostTurn,
            turn: 10,
            player_index: 0,
        }
    }

    fn planet(id: u16, owner: Option<u8>, detection_level: u8) -> PlanetBlock {
        PlanetBlock {
            planet_id: id,
            is_full: true,
            detection_level,
            owner_id: owner,
            environment: None,
            surface_minerals: None,
            installations: None,
            starbase: None,
            route_target: None,
            turn_number: None,
            extra_tail: vec![],
        }
    }

    #[test]
    fn ingest_and_lookup_planet() {
        let mut store = GameStateStore::new();
        store.ingest_planet(planet(1, Some(2), crate::blocks::planet::detection::FULL), provenance());
        assert_eq!(store.planet(1).unwrap().block.owner_id, Some(2));
        assert!(store.planet(2).is_none());
    }

    #[test]
    fn planets_owned_by_filters_correctly() {
        let mut store = GameStateStore::new();
        store.ingest_planet(planet(1, Some(2), crate::blocks::planet::detection::FULL), provenance());
        store.ingest_planet(planet(2, Some(3), crate::blocks::planet::detection::FULL), provenance());
        store.ingest_planet(planet(3, Some(2), crate::blocks::planet::detection::FULL), provenance());
        let owned: Vec<u16> = store.planets_owned_by(2).map(|e| e.block.planet_id).collect();
        assert_eq!(owned, vec![1, 3]);
    }

    #[test]
    fn planet_summaries_json_roundtrips_through_serde_json() {
        let mut store = GameStateStore::new();
        store.ingest_planet(planet(1, Some(2), crate::blocks::planet::detection::FULL), provenance());
        let json = store.planet_summaries_json().unwrap();
        let parsed: Vec<PlanetSummary> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].planet_id, 1);
        assert_eq!(parsed[0].owner_id, Some(2));
    }

    #[test]
    fn visibility_predicates_read_section_presence() {
        let mut visible = planet(1, None, crate::blocks::planet::detection::FULL);
        visible.environment = Some(crate::blocks::planet::EnvironmentSection {
            prefix_control: 0,
            fractional_concentration_prefix: vec![],
            mineral_concentrations: [1, 2, 3],
            values: crate::blocks::planet::Environment {
                gravity: 50,
                temperature: 50,
                radiation: 50,
            },
            original_values: None,
        });
        visible.starbase = Some(crate::blocks::planet::StarbaseSection {
            design_id: 1,
            defense_level: 1,
            has_drydock: false,
            reserved: 0,
        });
        assert!(can_see_minerals(&visible));
        assert!(!can_see_population(&visible));
        assert!(can_see_starbase(&visible));
    }

    #[test]
    fn waypoints_append_in_ingestion_order() {
        let mut store = GameStateStore::new();
        let wp_a = WaypointBlock {
            kind: crate::blocks::orders::WaypointKind::Add,
            fleet_id: 1,
            x: 1,
            y: 1,
            task: 0,
            extra_tail: vec![],
        };
        let mut wp_b = wp_a.clone();
        wp_b.x = 2;
        store.ingest_waypoint(wp_a.clone(), provenance());
        store.ingest_waypoint(wp_b.clone(), provenance());
        let waypoints = store.waypoints_for_fleet(provenance().player_index, 1);
        assert_eq!(waypoints.len(), 2);
        assert_eq!(waypoints[0].block, wp_a);
        assert_eq!(waypoints[1].block, wp_b);
    }
}
