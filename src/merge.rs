//! Cross-file entity reconciliation.
//!
//! Each entity type has its own precedence rule for picking a winner when
//! two files both describe the same entity. None of the rules fall back to
//! "most recent file wins" as a first resort — a file being newer doesn't
//! make its detection of a planet any better than an older file's, so
//! detection quality is compared first and recency only breaks genuine
//! ties.

use crate::error::{CoreError, MergeError};
use crate::store::{DesignEntity, FleetEntity, GameStateStore, PlanetEntity};
use crate::blocks::design::DesignBlock;
use crate::blocks::objects::ObjectRecordBlock;

/// Ranks a planet snapshot's detection quality: owner-known beats merely
/// environment-visible beats position-only.
fn planet_rank(planet: &PlanetEntity) -> u8 {
    if planet.block.owner_id.is_some() {
        2
    } else if planet.block.environment.is_some() {
        1
    } else {
        0
    }
}

pub fn merge_planet(a: PlanetEntity, b: PlanetEntity) -> PlanetEntity {
    match planet_rank(&a).cmp(&planet_rank(&b)) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => newer(a, b, |e| e.provenance.turn),
    }
}

/// Ranks a fleet snapshot: a record whose cargo mass is explicitly known
/// (i.e. has a cargo section at all, the wire's "explicit-mass" case) beats
/// one with none recorded; among two explicit-mass records, a richer ship
/// composition (more distinct hull slots detected) breaks the tie before
/// recency does.
fn fleet_rank(fleet: &FleetEntity) -> (u8, usize) {
    let has_mass = fleet.block.cargo != crate::blocks::fleet::Cargo::default();
    (if has_mass { 1 } else { 0 }, fleet.block.ship_counts.len())
}

pub fn merge_fleet(a: FleetEntity, b: FleetEntity) -> FleetEntity {
    match fleet_rank(&a).cmp(&fleet_rank(&b)) {
        std::cmp::Ordering::Greater => a,
        std::cmp::Ordering::Less => b,
        std::cmp::Ordering::Equal => newer(a, b, |e| e.provenance.turn),
    }
}

/// A full design definition always beats a brief one; between two of the
/// same completeness, the newer turn wins.
pub fn merge_design(a: (DesignBlock, u16), b: (DesignBlock, u16)) -> DesignBlock {
    let (design_a, turn_a) = a;
    let (design_b, turn_b) = b;
    match (design_a.full.is_some(), design_b.full.is_some()) {
        (true, false) => design_a,
        (false, true) => design_b,
        _ => {
            if turn_b > turn_a {
                design_b
            } else {
                design_a
            }
        }
    }
}

fn merge_design_entity(a: DesignEntity, b: DesignEntity) -> DesignEntity {
    match (a.block.full.is_some(), b.block.full.is_some()) {
        (true, false) => a,
        (false, true) => b,
        _ => {
            if b.provenance.turn > a.provenance.turn {
                b
            } else {
                a
            }
        }
    }
}

/// How many distinct fields an object record exposes — used as the
/// "larger-visibility-set" comparison for objects.
fn object_visibility(object: &ObjectRecordBlock) -> u8 {
    match object {
        ObjectRecordBlock::Minefield { .. } => 3,
        ObjectRecordBlock::PacketSalvage { .. } => 3,
        ObjectRecordBlock::Wormhole { .. } => 2,
        ObjectRecordBlock::Trader { .. } => 2,
    }
}

pub fn merge_object(a: (ObjectRecordBlock, u16), b: (ObjectRecordBlock, u16)) -> ObjectRecordBlock {
    let (object_a, turn_a) = a;
    let (object_b, turn_b) = b;
    match object_visibility(&object_a).cmp(&object_visibility(&object_b)) {
        std::cmp::Ordering::Greater => object_a,
        std::cmp::Ordering::Less => object_b,
        std::cmp::Ordering::Equal => {
            if turn_b > turn_a {
                object_b
            } else {
                object_a
            }
        }
    }
}

fn newer<T, F: Fn(&T) -> u16>(a: T, b: T, turn_of: F) -> T {
    if turn_of(&b) > turn_of(&a) {
        b
    } else {
        a
    }
}

/// Merges `right` into `left`, applying each entity type's precedence rule
/// on overlap. Players are a special case: the game_id/turn
/// identity check below ensures both stores describe the same turn, so a
/// player's first-sighted record is retained as-is and only its derived
/// counts (ships, starbases, fleets — recomputed from the merged planet and
/// fleet tables) change.
pub fn merge_stores(
    left_identity: (u32, u16),
    left: GameStateStore,
    right_identity: (u32, u16),
    right: GameStateStore,
) -> Result<GameStateStore, CoreError> {
    if left_identity != right_identity {
        return Err(CoreError::merge(MergeError {
            left: left_identity,
            right: right_identity,
        }));
    }

    let mut merged = left;
    for entity in right.planets().cloned().collect::<Vec<_>>() {
        let id = entity.block.planet_id;
        let winner = match merged.planet(id) {
            Some(existing) => merge_planet(existing.clone(), entity),
            None => entity,
        };
        merged.ingest_planet(winner.block, winner.provenance);
    }
    for entity in right.fleets().cloned().collect::<Vec<_>>() {
        let key = (entity.block.owner_id, entity.block.fleet_id);
        let winner = match merged.fleet(key) {
            Some(existing) => merge_fleet(existing.clone(), entity),
            None => entity,
        };
        merged.ingest_fleet(winner.block, winner.provenance);
    }
    for entity in right.designs().cloned().collect::<Vec<_>>() {
        let key = (entity.block.owner_id, entity.block.is_starbase, entity.block.design_id);
        let winner = match merged.design(key) {
            Some(existing) => merge_design_entity(existing.clone(), entity),
            None => entity,
        };
        merged.ingest_design(winner.block, winner.provenance);
    }
    let right_objects: Vec<(u16, crate::store::ObjectEntity)> =
        right.objects().map(|(&id, entity)| (id, entity.clone())).collect();
    for (id, entity) in right_objects {
        let winner = match merged.object(id) {
            Some(existing) => merge_object_entity(existing.clone(), entity),
            None => entity,
        };
        merged.ingest_object(id, winner.block, winner.provenance);
    }
    for entity in right.players().cloned().collect::<Vec<_>>() {
        if merged.player(entity.block.player_id).is_none() {
            merged.ingest_player(entity.block, entity.provenance);
        }
    }

    recompute_player_counts(&mut merged);
    Ok(merged)
}

fn merge_object_entity(a: crate::store::ObjectEntity, b: crate::store::ObjectEntity) -> crate::store::ObjectEntity {
    let a_turn = a.provenance.turn;
    let b_turn = b.provenance.turn;
    let provenance = if object_visibility(&b.block) > object_visibility(&a.block)
        || (object_visibility(&b.block) == object_visibility(&a.block) && b_turn > a_turn)
    {
        b.provenance
    } else {
        a.provenance
    };
    let block = merge_object((a.block, a_turn), (b.block, b_turn));
    crate::store::ObjectEntity { block, provenance }
}

/// Recomputes each player's planet and starbase counts from the merged
/// planet table and writes them into that player's scoreboard entry, since
/// a merge can surface ownership the player's own file never reported.
/// Fleet and ship/starbase design counts (I4) are kept current automatically
/// as [`GameStateStore::ingest_fleet`]/[`GameStateStore::ingest_design`]
/// run during the merge above, landing on each [`crate::store::PlayerEntity::counts`].
/// Ship-class tallies and resource/score totals aren't derivable from the
/// entities this crate tracks, so they're carried over from whichever
/// scoreboard entry already existed.
fn recompute_player_counts(store: &mut GameStateStore) {
    let player_ids: Vec<u8> = store.players().map(|p| p.block.player_id).collect();
    let mut updates = Vec::new();
    for player_id in player_ids {
        let planet_count = store.planets_owned_by(player_id).count() as u16;
        let starbase_count = store
            .planets_owned_by(player_id)
            .filter(|p| p.block.starbase.is_some())
            .count() as u16;
        let mut scores = store
            .player_scores(player_id)
            .map(|e| e.block.clone())
            .unwrap_or(crate::blocks::player::PlayerScoresBlock {
                player_id,
                planets: 0,
                starbases: 0,
                unarmed_ships: 0,
                escort_ships: 0,
                capital_ships: 0,
                tech_levels: 0,
                resources: 0,
                score: 0,
                extra_tail: vec![],
            });
        scores.planets = planet_count;
        scores.starbases = starbase_count;
        updates.push(scores);
    }
    for scores in updates {
        let provenance = store
            .player(scores.player_id)
            .map(|p| p.provenance)
            .unwrap_or(crate::store::Provenance {
                file_type: crate::framer::FileTypeTag::HostTurn,
                turn: 0,
                player_index: 0,
            });
        store.ingest_player_scores(scores, provenance);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::framer::FileTypeTag;
    use crate::store::Provenance;

    fn planet_entity(owner: Option<u8>, environment_known: bool, turn: u16) -> PlanetEntity {
        let environment = environment_known.then(|| crate::blocks::planet::EnvironmentSection {
            prefix_control: 0,
            fractional_concentration_prefix: vec![],
            mineral_concentrations: [0, 0, 0],
            values: crate::blocks::planet::Environment {
                gravity: 50,
                temperature: 50,
                radiation: 50,
            },
            original_values: None,
        });
        PlanetEntity {
            block: crate::blocks::planet::PlanetBlock {
                planet_id: 1,
                is_full: true,
                detection_level: if environment_known {
                    crate::blocks::planet::detection::SPECIAL
                } else {
                    crate::blocks::planet::detection::NOT_VISIBLE
                },
                owner_id: owner,
                environment,
                surface_minerals: None,
                installations: None,
                starbase: None,
                route_target: None,
                turn_number: None,
                extra_tail: vec![],
            },
            provenance: Provenance {
                file_type: FileTypeTag::HostTurn,
                turn,
                player_index: 0,
            },
        }
    }

    #[test]
    fn owner_known_beats_environment_visible_regardless_of_turn() {
        let owner_known = planet_entity(Some(1), false, 5);
        let env_only = planet_entity(None, true, 50);
        let winner = merge_planet(owner_known.clone(), env_only);
        assert_eq!(winner.block.owner_id, owner_known.block.owner_id);
    }

    #[test]
    fn equal_rank_breaks_tie_by_newer_turn() {
        let a = planet_entity(Some(1), false, 5);
        let b = planet_entity(Some(2), false, 50);
        let winner = merge_planet(a, b);
        assert_eq!(winner.provenance.turn, 50);
    }

    #[test]
    fn mismatched_identity_is_a_fatal_merge_error() {
        let err = merge_stores((1, 10), GameStateStore::new(), (1, 11), GameStateStore::new()).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::CoreErrorKind::Merge(_)
        ));
    }

    fn fleet_entity(owner: u8, fleet_id: u16, turn: u16) -> FleetEntity {
        FleetEntity {
            block: crate::blocks::fleet::FleetBlock {
                fleet_id,
                owner_id: owner,
                x: 0,
                y: 0,
                warp_speed: 0,
                task: 0,
                wide_counts: false,
                ship_counts: vec![],
                cargo: Default::default(),
                extra_tail: vec![],
            },
            provenance: Provenance {
                file_type: FileTypeTag::PlayerTurn,
                turn,
                player_index: owner,
            },
        }
    }

    #[test]
    fn two_players_sharing_a_fleet_number_do_not_collide_on_merge() {
        let mut left = GameStateStore::new();
        left.ingest_fleet(fleet_entity(1, 3, 5).block, fleet_entity(1, 3, 5).provenance);
        let mut right = GameStateStore::new();
        right.ingest_fleet(fleet_entity(2, 3, 5).block, fleet_entity(2, 3, 5).provenance);

        let merged = merge_stores((7, 5), left, (7, 5), right).unwrap();
        assert!(merged.fleet((1, 3)).is_some());
        assert!(merged.fleet((2, 3)).is_some());
    }

    #[test]
    fn merge_stores_unions_planets_from_both_sides() {
        let mut left = GameStateStore::new();
        left.ingest_planet(planet_entity(Some(1), false, 5).block, Provenance {
            file_type: FileTypeTag::HostTurn,
            turn: 5,
            player_index: 0,
        });
        let right = GameStateStore::new();
        let merged = merge_stores((7, 5), left, (7, 5), right).unwrap();
        assert!(merged.planet(1).is_some());
    }

    fn design_entity(owner: u8, is_starbase: bool, design_id: u8, turn: u16) -> DesignEntity {
        DesignEntity {
            block: crate::blocks::design::DesignBlock {
                design_id,
                owner_id: owner,
                is_starbase,
                hull_type: 0,
                name: crate::strcodec::EncodedName::new("Scout"),
                full: None,
                extra_tail: vec![],
            },
            provenance: Provenance {
                file_type: FileTypeTag::PlayerTurn,
                turn,
                player_index: owner,
            },
        }
    }

    /// I4: after a merge, each player's design/fleet counts match the
    /// merged store's own entity tables, not just whatever a single
    /// contributing file happened to report.
    #[test]
    fn player_counts_satisfy_i4_after_merge() {
        let mut left = GameStateStore::new();
        left.ingest_player(
            crate::blocks::player::PlayerBlock {
                player_id: 1,
                race_id: 0,
                status: 0,
                detail_flags: 0,
                home_planet: 0,
                ai_flags: 0,
                full_data: None,
                relations: vec![],
                race_name_singular: crate::strcodec::EncodedName::new("Human"),
                race_name_plural: crate::strcodec::EncodedName::new("Humans"),
                extra_tail: vec![],
            },
            Provenance {
                file_type: FileTypeTag::HostTurn,
                turn: 5,
                player_index: 1,
            },
        );
        left.ingest_design(design_entity(1, false, 1, 5).block, design_entity(1, false, 1, 5).provenance);
        left.ingest_fleet(fleet_entity(1, 1, 5).block, fleet_entity(1, 1, 5).provenance);

        let mut right = GameStateStore::new();
        right.ingest_design(design_entity(1, false, 2, 6).block, design_entity(1, false, 2, 6).provenance);
        right.ingest_design(design_entity(1, true, 3, 6).block, design_entity(1, true, 3, 6).provenance);
        right.ingest_fleet(fleet_entity(1, 2, 6).block, fleet_entity(1, 2, 6).provenance);

        let merged = merge_stores((7, 5), left, (7, 5), right).unwrap();

        let expected_ship_designs = merged
            .designs()
            .filter(|d| d.block.owner_id == 1 && !d.block.is_starbase)
            .count() as u16;
        let expected_starbase_designs = merged
            .designs()
            .filter(|d| d.block.owner_id == 1 && d.block.is_starbase)
            .count() as u16;
        let expected_fleets = merged.fleets_owned_by(1).count() as u16;

        let counts = merged.player(1).unwrap().counts;
        assert_eq!(counts.ship_design_count, expected_ship_designs);
        assert_eq!(counts.starbase_design_count, expected_starbase_designs);
        assert_eq!(counts.fleet_count, expected_fleets);
        assert_eq!(counts.ship_design_count, 2);
        assert_eq!(counts.starbase_design_count, 1);
        assert_eq!(counts.fleet_count, 2);
    }
}
