//! Editable race definition, its range/consistency validator, and the
//! advantage-point cost function used to check a custom race against the
//! game's point budget.
//!
//! The six canonical predefined races exist in the original game purely as
//! data, not as anything this crate's corpus documents a byte-for-byte
//! encoding of; [`preset_races`] and the point values [`advantage_points`]
//! produces for them are this implementation's own numbers, chosen to be
//! internally consistent rather than to match a specific historical
//! release (see `DESIGN.md`, Open Questions).

use crate::error::CoreError;
use crate::strcodec::EncodedName;

/// Primary racial trait (spec glossary "PRT") — exactly one per race.
/// Discriminants match the wire's primary-race-trait index (0-9); JOAT is
/// pinned at 9 per the `Game.m1` decode scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryTrait {
    HyperExpansion = 0,
    WarMonger = 1,
    Industrialist = 2,
    SpaceDemolition = 3,
    Claim = 4,
    InnerStrength = 5,
    AlternateReality = 6,
    Insectoid = 7,
    Supercool = 8,
    JackOfAllTrades = 9,
}

impl PrimaryTrait {
    fn base_cost(self) -> i32 {
        match self {
            Self::HyperExpansion => -20,
            Self::JackOfAllTrades => 0,
            Self::WarMonger => 10,
            Self::Industrialist => -10,
            Self::SpaceDemolition => 5,
            Self::Claim => -15,
            Self::InnerStrength => 5,
            Self::AlternateReality => -25,
            Self::Insectoid => 0,
            Self::Supercool => 15,
        }
    }

    /// The wire's 0-9 primary-race-trait index.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Result<Self, CoreError> {
        match index {
            0 => Ok(Self::HyperExpansion),
            1 => Ok(Self::WarMonger),
            2 => Ok(Self::Industrialist),
            3 => Ok(Self::SpaceDemolition),
            4 => Ok(Self::Claim),
            5 => Ok(Self::InnerStrength),
            6 => Ok(Self::AlternateReality),
            7 => Ok(Self::Insectoid),
            8 => Ok(Self::Supercool),
            9 => Ok(Self::JackOfAllTrades),
            other => Err(CoreError::validation(
                "primary_trait_index",
                format!("{other} is outside the 0..=9 primary-race-trait range"),
            )),
        }
    }
}

/// Lesser racial trait (spec glossary "LRT") — a race selects any subset,
/// packed as one bit per trait in the wire's 16-bit lesser-race-traits mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LesserTrait {
    ImprovedFuelEfficiency = 0,
    TotalTerraforming = 1,
    AdvancedRemoteMining = 2,
    ImprovedStarbases = 3,
    GeneralizedResearch = 4,
    UltimateRecycling = 5,
    CheapEngines = 6,
    OnlyBasicRemoteMining = 7,
    NoRamscoopEngines = 8,
    CheapDockingFacility = 9,
}

const ALL_LESSER_TRAITS: [LesserTrait; 10] = [
    LesserTrait::ImprovedFuelEfficiency,
    LesserTrait::TotalTerraforming,
    LesserTrait::AdvancedRemoteMining,
    LesserTrait::ImprovedStarbases,
    LesserTrait::GeneralizedResearch,
    LesserTrait::UltimateRecycling,
    LesserTrait::CheapEngines,
    LesserTrait::OnlyBasicRemoteMining,
    LesserTrait::NoRamscoopEngines,
    LesserTrait::CheapDockingFacility,
];

impl LesserTrait {
    fn cost(self) -> i32 {
        match self {
            Self::ImprovedFuelEfficiency => 5,
            Self::TotalTerraforming => 8,
            Self::AdvancedRemoteMining => 6,
            Self::ImprovedStarbases => 7,
            Self::GeneralizedResearch => 4,
            Self::UltimateRecycling => 6,
            Self::CheapEngines => -4,
            Self::OnlyBasicRemoteMining => -6,
            Self::NoRamscoopEngines => -8,
            Self::CheapDockingFacility => 3,
        }
    }

    fn bit(self) -> u16 {
        1u16 << (self as u16)
    }

    /// Unpacks every set bit of the wire's 16-bit lesser-race-traits mask
    /// into the traits it names, in declaration order.
    pub fn from_mask(mask: u16) -> Vec<Self> {
        ALL_LESSER_TRAITS
            .iter()
            .copied()
            .filter(|trait_| mask & trait_.bit() != 0)
            .collect()
    }

    /// Packs a set of traits back into the wire's 16-bit mask.
    pub fn to_mask(traits: &[Self]) -> u16 {
        traits.iter().fold(0u16, |mask, t| mask | t.bit())
    }
}

/// Min/max/immune triple shared by gravity, temperature, and radiation
/// habitability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitabilityRange {
    pub min: u8,
    pub max: u8,
    pub immune: bool,
}

impl HabitabilityRange {
    fn span(self) -> u8 {
        self.max.saturating_sub(self.min)
    }

    fn validate(self, field: &'static str) -> Result<(), CoreError> {
        if self.min > self.max {
            return Err(CoreError::validation(
                field,
                format!("min ({}) exceeds max ({})", self.min, self.max),
            ));
        }
        if self.max > 100 {
            return Err(CoreError::validation(
                field,
                format!("max ({}) exceeds the 0..=100 habitability scale", self.max),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceDefinition {
    pub singular_name: EncodedName,
    pub plural_name: EncodedName,
    pub primary_trait: PrimaryTrait,
    pub lesser_traits: Vec<LesserTrait>,
    pub gravity: HabitabilityRange,
    pub temperature: HabitabilityRange,
    pub radiation: HabitabilityRange,
    pub growth_rate: u8,
    pub colonist_resource_factor: u8,
    /// Per-field research cost modifier, percent of baseline (100 = no
    /// modifier), in field order matching [`crate::blocks::player::PlayerFullData::research_levels`].
    pub research_cost_modifiers: [u8; 6],
}

/// Builds a race definition from the wire fields embedded in a player's
/// full-data section (primary trait, lesser traits, habitability, growth
/// rate, research-cost modifiers), alongside the two length-prefixed race
/// names carried at the tail of the player block itself.
pub fn race_from_player_full_data(
    full: &crate::blocks::player::PlayerFullData,
    singular_name: EncodedName,
    plural_name: EncodedName,
) -> Result<RaceDefinition, CoreError> {
    Ok(RaceDefinition {
        singular_name,
        plural_name,
        primary_trait: PrimaryTrait::from_index(full.primary_trait_index)?,
        lesser_traits: LesserTrait::from_mask(full.lesser_traits_mask),
        gravity: full.gravity.to_range(),
        temperature: full.temperature.to_range(),
        radiation: full.radiation.to_range(),
        growth_rate: full.growth_rate,
        colonist_resource_factor: full.colonist_resource_factor,
        research_cost_modifiers: full.research_cost_modifiers,
    })
}

/// Writes a race definition's fields back into an existing full-data
/// section, leaving every other wire field (research progress, password,
/// homeworld, production queue, …) untouched.
pub fn apply_race_to_player_full_data(def: &RaceDefinition, full: &mut crate::blocks::player::PlayerFullData) {
    full.primary_trait_index = def.primary_trait.index();
    full.lesser_traits_mask = LesserTrait::to_mask(&def.lesser_traits);
    full.gravity = crate::blocks::player::HabitabilityBytes::from_range(def.gravity);
    full.temperature = crate::blocks::player::HabitabilityBytes::from_range(def.temperature);
    full.radiation = crate::blocks::player::HabitabilityBytes::from_range(def.radiation);
    full.growth_rate = def.growth_rate;
    full.colonist_resource_factor = def.colonist_resource_factor;
    full.research_cost_modifiers = def.research_cost_modifiers;
}

/// Checks every range and consistency rule a race definition must satisfy,
/// returning the first violation as a [`crate::error::CoreErrorKind::Validation`] error.
pub fn validate(def: &RaceDefinition) -> Result<(), CoreError> {
    def.gravity.validate("gravity")?;
    def.temperature.validate("temperature")?;
    def.radiation.validate("radiation")?;

    if !(1..=20).contains(&def.growth_rate) {
        return Err(CoreError::validation(
            "growth_rate",
            format!("{} is outside the allowed 1..=20 range", def.growth_rate),
        ));
    }
    if !(1..=30).contains(&def.colonist_resource_factor) {
        return Err(CoreError::validation(
            "colonist_resource_factor",
            format!(
                "{} is outside the allowed 1..=30 range",
                def.colonist_resource_factor
            ),
        ));
    }
    for (field, modifier) in def.research_cost_modifiers.iter().enumerate() {
        if !(25..=300).contains(modifier) {
            return Err(CoreError::validation(
                "research_cost_modifiers",
                format!("field {field} modifier {modifier} is outside the allowed 25..=300 range"),
            ));
        }
    }
    let mut sorted_traits = def.lesser_traits.clone();
    sorted_traits.sort();
    if sorted_traits.windows(2).any(|w| w[0] == w[1]) {
        return Err(CoreError::validation(
            "lesser_traits",
            "duplicate lesser trait selected".into(),
        ));
    }
    Ok(())
}

/// Computes the race's net advantage-point cost: primary trait base cost,
/// plus each selected lesser trait's cost, plus a habitability term (wider
/// tolerance costs more) and a growth/economy term (faster growth and
/// cheaper research cost more, consistent with the game rewarding narrow,
/// slow, expensive-research races with point refunds).
pub fn advantage_points(def: &RaceDefinition) -> i32 {
    let mut points = def.primary_trait.base_cost();
    points += def.lesser_traits.iter().map(|t| t.cost()).sum::<i32>();

    let habitability_span = def.gravity.span() as i32 + def.temperature.span() as i32 + def.radiation.span() as i32;
    points += habitability_span / 10;
    if def.gravity.immune {
        points += 8;
    }
    if def.temperature.immune {
        points += 8;
    }
    if def.radiation.immune {
        points += 8;
    }

    points += (def.growth_rate as i32 - 10) * 2;
    points += (20 - def.colonist_resource_factor as i32).max(0);

    let avg_research_modifier: i32 =
        def.research_cost_modifiers.iter().map(|&m| m as i32).sum::<i32>() / def.research_cost_modifiers.len() as i32;
    points += (100 - avg_research_modifier) / 5;

    points
}

/// The six predefined races shipped alongside the game, as fixtures rather
/// than a faithful transcription — see the module doc comment.
pub fn preset_races() -> Vec<RaceDefinition> {
    let narrow = |min, max| HabitabilityRange { min, max, immune: false };
    vec![
        RaceDefinition {
            singular_name: EncodedName::new("Human"),
            plural_name: EncodedName::new("Humans"),
            primary_trait: PrimaryTrait::JackOfAllTrades,
            lesser_traits: vec![LesserTrait::GeneralizedResearch],
            gravity: narrow(30, 70),
            temperature: narrow(30, 70),
            radiation: narrow(30, 70),
            growth_rate: 15,
            colonist_resource_factor: 10,
            research_cost_modifiers: [100; 6],
        },
        RaceDefinition {
            singular_name: EncodedName::new("Antaran"),
            plural_name: EncodedName::new("Antarans"),
            primary_trait: PrimaryTrait::WarMonger,
            lesser_traits: vec![LesserTrait::ImprovedStarbases],
            gravity: narrow(40, 85),
            temperature: narrow(20, 60),
            radiation: narrow(10, 90),
            growth_rate: 17,
            colonist_resource_factor: 9,
            research_cost_modifiers: [90, 90, 120, 120, 100, 100],
        },
        RaceDefinition {
            singular_name: EncodedName::new("Silicoid"),
            plural_name: EncodedName::new("Silicoids"),
            primary_trait: PrimaryTrait::Industrialist,
            lesser_traits: vec![LesserTrait::UltimateRecycling],
            gravity: HabitabilityRange {
                min: 0,
                max: 100,
                immune: true,
            },
            temperature: HabitabilityRange {
                min: 0,
                max: 100,
                immune: true,
            },
            radiation: narrow(20, 80),
            growth_rate: 8,
            colonist_resource_factor: 14,
            research_cost_modifiers: [110, 110, 110, 110, 110, 110],
        },
        RaceDefinition {
            singular_name: EncodedName::new("Insectoid"),
            plural_name: EncodedName::new("Insectoids"),
            primary_trait: PrimaryTrait::Insectoid,
            lesser_traits: vec![LesserTrait::AdvancedRemoteMining],
            gravity: narrow(20, 90),
            temperature: narrow(40, 100),
            radiation: narrow(30, 90),
            growth_rate: 19,
            colonist_resource_factor: 8,
            research_cost_modifiers: [100, 100, 100, 100, 100, 100],
        },
        RaceDefinition {
            singular_name: EncodedName::new("Nomad"),
            plural_name: EncodedName::new("Nomads"),
            primary_trait: PrimaryTrait::AlternateReality,
            lesser_traits: vec![LesserTrait::ImprovedFuelEfficiency, LesserTrait::CheapEngines],
            gravity: narrow(10, 90),
            temperature: narrow(10, 90),
            radiation: narrow(10, 90),
            growth_rate: 12,
            colonist_resource_factor: 12,
            research_cost_modifiers: [100; 6],
        },
        RaceDefinition {
            singular_name: EncodedName::new("Rebel"),
            plural_name: EncodedName::new("Rebels"),
            primary_trait: PrimaryTrait::HyperExpansion,
            lesser_traits: vec![LesserTrait::TotalTerraforming],
            gravity: narrow(35, 65),
            temperature: narrow(35, 65),
            radiation: narrow(35, 65),
            growth_rate: 20,
            colonist_resource_factor: 10,
            research_cost_modifiers: [100; 6],
        },
    ]
}

#[cfg(test)]
mod test {
    use super::*;

    fn baseline() -> RaceDefinition {
        RaceDefinition {
            singular_name: EncodedName::new("Human"),
            plural_name: EncodedName::new("Humans"),
            primary_trait: PrimaryTrait::JackOfAllTrades,
            lesser_traits: vec![],
            gravity: HabitabilityRange {
                min: 30,
                max: 70,
                immune: false,
            },
            temperature: HabitabilityRange {
                min: 30,
                max: 70,
                immune: false,
            },
            radiation: HabitabilityRange {
                min: 30,
                max: 70,
                immune: false,
            },
            growth_rate: 15,
            colonist_resource_factor: 10,
            research_cost_modifiers: [100; 6],
        }
    }

    #[test]
    fn baseline_race_validates() {
        assert!(validate(&baseline()).is_ok());
    }

    #[test]
    fn inverted_habitability_range_is_rejected() {
        let mut def = baseline();
        def.gravity.min = 80;
        def.gravity.max = 20;
        assert!(validate(&def).is_err());
    }

    #[test]
    fn duplicate_lesser_trait_is_rejected() {
        let mut def = baseline();
        def.lesser_traits = vec![LesserTrait::CheapEngines, LesserTrait::CheapEngines];
        assert!(validate(&def).is_err());
    }

    #[test]
    fn non_adjacent_duplicate_lesser_trait_is_rejected() {
        let mut def = baseline();
        def.lesser_traits = vec![
            LesserTrait::CheapEngines,
            LesserTrait::ImprovedFuelEfficiency,
            LesserTrait::CheapEngines,
        ];
        assert!(validate(&def).is_err());
    }

    #[test]
    fn wider_habitability_costs_more_points() {
        let narrow = baseline();
        let mut wide = baseline();
        wide.gravity.max = 100;
        wide.gravity.min = 0;
        assert!(advantage_points(&wide) > advantage_points(&narrow));
    }

    #[test]
    fn cheaper_research_modifiers_cost_more_points() {
        let mut cheap_research = baseline();
        cheap_research.research_cost_modifiers = [50; 6];
        let mut expensive_research = baseline();
        expensive_research.research_cost_modifiers = [200; 6];
        assert!(advantage_points(&cheap_research) > advantage_points(&expensive_research));
    }

    #[test]
    fn preset_races_all_validate() {
        for race in preset_races() {
            assert!(validate(&race).is_ok(), "{} failed validation", race.singular_name.value());
        }
    }

    #[test]
    fn jack_of_all_trades_index_is_pinned_to_nine() {
        assert_eq!(PrimaryTrait::JackOfAllTrades.index(), 9);
        assert_eq!(PrimaryTrait::from_index(9).unwrap(), PrimaryTrait::JackOfAllTrades);
    }

    #[test]
    fn primary_trait_index_out_of_range_is_rejected() {
        assert!(PrimaryTrait::from_index(10).is_err());
    }

    #[test]
    fn lesser_trait_mask_roundtrips() {
        let traits = vec![LesserTrait::CheapEngines, LesserTrait::TotalTerraforming];
        let mask = LesserTrait::to_mask(&traits);
        let mut back = LesserTrait::from_mask(mask);
        back.sort();
        let mut expected = traits;
        expected.sort();
        assert_eq!(back, expected);
    }

    #[test]
    fn race_roundtrips_through_player_full_data() {
        let def = baseline();
        let mut full = crate::blocks::player::PlayerFullData::zeroed();
        apply_race_to_player_full_data(&def, &mut full);
        let recovered = race_from_player_full_data(
            &full,
            def.singular_name.clone(),
            def.plural_name.clone(),
        )
        .unwrap();
        assert_eq!(recovered.primary_trait, def.primary_trait);
        assert_eq!(recovered.lesser_traits, def.lesser_traits);
        assert_eq!(recovered.gravity, def.gravity);
        assert_eq!(recovered.temperature, def.temperature);
        assert_eq!(recovered.radiation, def.radiation);
        assert_eq!(recovered.growth_rate, def.growth_rate);
        assert_eq!(recovered.colonist_resource_factor, def.colonist_resource_factor);
        assert_eq!(recovered.research_cost_modifiers, def.research_cost_modifiers);
    }

    #[test]
    fn immune_habitability_survives_the_wire_and_back() {
        let mut def = baseline();
        def.gravity = HabitabilityRange {
            min: 0,
            max: 100,
            immune: true,
        };
        let mut full = crate::blocks::player::PlayerFullData::zeroed();
        apply_race_to_player_full_data(&def, &mut full);
        let recovered = race_from_player_full_data(
            &full,
            def.singular_name.clone(),
            def.plural_name.clone(),
        )
        .unwrap();
        assert!(recovered.gravity.immune);
    }
}
