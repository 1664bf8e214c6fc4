// ABOUTME: Core data models for the alignment engine
// ABOUTME: Reference records, macro profiles, detector input, stages, and results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Data model shared by every resolution stage.
//!
//! `ReferenceEntry` mirrors one record of the external nutrition reference
//! database (USDA `FoodData` Central shaped). `AlignmentResult` is the single
//! output of a resolution, carrying either a full macro profile, an
//! energy-only estimate, or an explicit unknown, never a partially
//! estimated profile.

use crate::telemetry::ResolutionTrail;
use serde::{Deserialize, Serialize};

/// Caloric density of fat (kcal per gram)
pub const KCAL_PER_G_FAT: f64 = 9.0;
/// Caloric density of protein (kcal per gram)
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// Caloric density of carbohydrate (kcal per gram)
pub const KCAL_PER_G_CARB: f64 = 4.0;

/// Provenance tier of a reference record, in decreasing trust order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceTier {
    /// Foundation Foods: lab-analyzed, highest trust
    Foundation,
    /// SR Legacy: the retired Standard Reference database
    SrLegacy,
    /// Branded: label-derived, lowest trust
    Branded,
}

impl ProvenanceTier {
    /// Rank for deterministic tie-breaks; lower ranks are preferred
    #[must_use]
    pub const fn trust_rank(self) -> u8 {
        match self {
            Self::Foundation => 0,
            Self::SrLegacy => 1,
            Self::Branded => 2,
        }
    }
}

/// Physical preparation form of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FoodForm {
    /// Uncooked, as harvested/butchered
    #[default]
    Raw,
    /// Heat-treated in any fashion
    Cooked,
}

/// Cooking method attached to a record or predicted by the detector.
///
/// Compatibility between methods is an equivalence relation over groups
/// (dry-heat oven methods, direct-heat methods, pan methods, moist-heat
/// methods), never plain string equality: a detector that says "baked"
/// must admit a "roasted" reference record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CookMethod {
    /// No heat applied
    Raw,
    /// Simmered in water
    Boiled,
    /// Cooked over steam
    Steamed,
    /// Gently cooked in barely-simmering liquid
    Poached,
    /// Slow-cooked in liquid
    Stewed,
    /// Browned then slow-cooked in covered liquid
    Braised,
    /// Dry oven heat
    Roasted,
    /// Dry oven heat, baked goods register
    Baked,
    /// Oven-roasted (reference-database naming quirk for roasted)
    RoastedOven,
    /// Direct heat from below
    Grilled,
    /// Direct heat from above
    Broiled,
    /// High-heat pan finish
    PanSeared,
    /// Pan-cooked in a small amount of fat
    Sauteed,
    /// Wok-tossed over high heat
    StirFried,
    /// Cooked in fat
    Fried,
    /// Submerged in hot fat
    DeepFried,
}

impl CookMethod {
    /// Equivalence-group id for the symmetric compatibility relation
    const fn equivalence_group(self) -> u8 {
        match self {
            Self::Raw => 0,
            Self::Boiled | Self::Steamed | Self::Poached | Self::Stewed | Self::Braised => 1,
            Self::Roasted | Self::Baked | Self::RoastedOven => 2,
            Self::Grilled | Self::Broiled => 3,
            Self::PanSeared | Self::Sauteed | Self::StirFried => 4,
            Self::Fried | Self::DeepFried => 5,
        }
    }

    /// Symmetric method compatibility: same variant or same equivalence group
    #[must_use]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        self.equivalence_group() == other.equivalence_group()
    }

    /// Parse a method from a normalized token, if it names one
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "raw" => Some(Self::Raw),
            "boiled" | "simmered" => Some(Self::Boiled),
            "steamed" => Some(Self::Steamed),
            "poached" => Some(Self::Poached),
            "stewed" => Some(Self::Stewed),
            "braised" => Some(Self::Braised),
            "roasted" => Some(Self::Roasted),
            "baked" | "toasted" => Some(Self::Baked),
            "grilled" => Some(Self::Grilled),
            "broiled" => Some(Self::Broiled),
            "seared" | "pan_seared" => Some(Self::PanSeared),
            "sauteed" => Some(Self::Sauteed),
            "stir_fried" => Some(Self::StirFried),
            "fried" => Some(Self::Fried),
            "deep_fried" => Some(Self::DeepFried),
            _ => None,
        }
    }
}

/// Per-100g macronutrient and energy profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MacroProfile {
    /// Protein (g per 100g)
    pub protein_g: f64,
    /// Carbohydrate (g per 100g)
    pub carbs_g: f64,
    /// Total fat (g per 100g)
    pub fat_g: f64,
    /// Energy (kcal per 100g)
    pub kcal: f64,
    /// Dietary fiber (g per 100g)
    pub fiber_g: f64,
}

impl MacroProfile {
    /// Atwater caloric estimate: 4 kcal/g protein and carbohydrate, 9 kcal/g fat
    #[must_use]
    pub fn atwater_kcal(&self) -> f64 {
        KCAL_PER_G_PROTEIN * self.protein_g
            + KCAL_PER_G_CARB * self.carbs_g
            + KCAL_PER_G_FAT * self.fat_g
    }

    /// Scale every component by a factor (mass conversions)
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            kcal: self.kcal * factor,
            fiber_g: self.fiber_g * factor,
        }
    }

    /// All components non-negative (reference-record invariant)
    #[must_use]
    pub fn is_non_negative(&self) -> bool {
        self.protein_g >= 0.0
            && self.carbs_g >= 0.0
            && self.fat_g >= 0.0
            && self.kcal >= 0.0
            && self.fiber_g >= 0.0
    }
}

/// One record of the external nutrition reference database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Stable record id (FDC id shaped)
    pub id: u64,
    /// Normalized canonical food category key (e.g. `rice_white`)
    pub core_class: String,
    /// Full record description as published
    pub name: String,
    /// Provenance tier
    pub tier: ProvenanceTier,
    /// Physical form
    pub form: FoodForm,
    /// Cooking method when the record is cooked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<CookMethod>,
    /// Per-100g profile
    pub per_100g: MacroProfile,
    /// Brand owner for branded records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
}

/// Broad food category used by energy-band fallbacks and the Stage-Z2
/// eligibility gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    /// Fresh fruit
    Fruit,
    /// Nuts and seeds
    NutsSeeds,
    /// Vegetables
    Vegetable,
    /// Legumes and pulses
    Legume,
    /// Meat and poultry
    MeatPoultry,
    /// Fish and seafood
    FishSeafood,
    /// Starches and grains
    StarchGrain,
    /// Eggs
    Egg,
    /// Dairy
    Dairy,
    /// Anything the classifier cannot bucket
    Other,
}

impl FoodCategory {
    /// Bucket a core class key into a category.
    ///
    /// Matching is substring-based over the normalized class key; the first
    /// bucket whose marker list hits wins, so more specific markers are
    /// listed before generic ones (`peanut` before `pea`).
    #[must_use]
    pub fn classify(core_class: &str) -> Self {
        const BUCKETS: &[(FoodCategory, &[&str])] = &[
            (
                FoodCategory::NutsSeeds,
                &[
                    "almond", "walnut", "cashew", "pecan", "pistachio", "peanut", "hazelnut",
                    "macadamia", "sunflower", "sesame", "chia", "flax", "seed", "nuts",
                ],
            ),
            (
                FoodCategory::FishSeafood,
                &[
                    "salmon", "tuna", "cod", "tilapia", "shrimp", "prawn", "crab", "lobster",
                    "sardine", "mackerel", "trout", "fish",
                ],
            ),
            (
                FoodCategory::MeatPoultry,
                &[
                    "chicken", "beef", "pork", "turkey", "lamb", "duck", "veal", "bacon",
                    "sausage", "ham", "steak", "meat",
                ],
            ),
            // Vegetable before Egg ("eggplant") and before Fruit ("cherry_tomato")
            (
                FoodCategory::Vegetable,
                &[
                    "broccoli", "spinach", "carrot", "tomato", "onion", "pepper", "cucumber",
                    "lettuce", "cabbage", "zucchini", "cauliflower", "asparagus", "kale",
                    "celery", "mushroom", "squash", "eggplant", "vegetable",
                ],
            ),
            (FoodCategory::Egg, &["egg"]),
            // Fruit before Legume ("peach" vs "pea")
            (
                FoodCategory::Fruit,
                &[
                    "apple", "banana", "orange", "berry", "grape", "melon", "mango", "peach",
                    "pear", "pineapple", "plum", "cherry", "kiwi", "apricot", "fig", "fruit",
                ],
            ),
            (
                FoodCategory::Legume,
                &["lentil", "chickpea", "bean", "pea", "soy", "tofu", "edamame", "hummus"],
            ),
            (
                FoodCategory::StarchGrain,
                &[
                    "rice", "pasta", "bread", "oat", "quinoa", "potato", "noodle", "tortilla",
                    "couscous", "barley", "cereal", "grain", "wheat", "corn",
                ],
            ),
            (
                FoodCategory::Dairy,
                &["milk", "yogurt", "cheese", "butter", "cream", "kefir"],
            ),
        ];

        for (category, markers) in BUCKETS {
            if markers.iter().any(|m| core_class.contains(m)) {
                return *category;
            }
        }
        Self::Other
    }

    /// Whether this category is permanently barred from the Stage-Z2
    /// energy-only proxy. A Z2 hit in one of these signals an upstream bug
    /// (the reference database has dense raw coverage for them), not a gap.
    #[must_use]
    pub const fn barred_from_energy_proxy(self) -> bool {
        matches!(
            self,
            Self::Fruit | Self::NutsSeeds | Self::Vegetable | Self::Legume
        )
    }

    /// Whether this category is admitted to Z2 even when raw Foundation
    /// candidates exist (cooked-protein coverage is known-poor)
    #[must_use]
    pub const fn energy_proxy_always_admitted(self) -> bool {
        matches!(self, Self::MeatPoultry | Self::FishSeafood)
    }
}

/// One vision-derived item handed to the resolver by the detector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedItem {
    /// Free-form food name as predicted
    pub name: String,
    /// Predicted physical form, if the detector committed to one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FoodForm>,
    /// Estimated portion mass in grams
    pub mass_g: f64,
    /// Discrete item count when countable ("2 eggs")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Detector calorie estimate for the whole portion. Never trusted as
    /// ground truth; consulted only under the `trust_detector_kcal` flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcal_hint: Option<f64>,
}

impl DetectedItem {
    /// Convenience constructor for the common name+mass case
    #[must_use]
    pub fn new(name: impl Into<String>, mass_g: f64) -> Self {
        Self {
            name: name.into(),
            form: None,
            mass_g,
            count: None,
            confidence: 1.0,
            kcal_hint: None,
        }
    }

    /// Predicted energy density (kcal/100g) derived from the portion hint
    #[must_use]
    pub fn predicted_energy_density(&self) -> Option<f64> {
        match self.kcal_hint {
            Some(kcal) if self.mass_g > 0.0 => Some(kcal / self.mass_g * 100.0),
            _ => None,
        }
    }
}

/// Closed set of resolution stages. An "unknown stage" is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    /// Stage 1: cooked-exact admission (method-compatible, energy-gated)
    CookedExact,
    /// Stage 1b: raw-direct admission
    RawDirect,
    /// Stage 1c: processed pick corrected to a raw/fresh sibling
    RawPreference,
    /// Stage 1S: optional semantic retrieval
    Semantic,
    /// Stage 2: raw seed converted through the physical kernels
    RawConverted,
    /// Stages 3/4: lexical/branded scoring admission
    BrandedScored,
    /// Stage 5: composite decomposed into resolved components
    Decomposed,
    /// Stage Z1: curated keyed fallback
    KeyedFallback,
    /// Stage Z2: strictly-gated energy-only proxy
    EnergyOnly,
    /// Stage 0: terminal no-match
    NoMatch,
}

impl MatchStage {
    /// The stage label used in telemetry and reports
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CookedExact => "1",
            Self::RawDirect => "1b",
            Self::RawPreference => "1c",
            Self::Semantic => "1s",
            Self::RawConverted => "2",
            Self::BrandedScored => "3/4",
            Self::Decomposed => "5",
            Self::KeyedFallback => "z1",
            Self::EnergyOnly => "z2",
            Self::NoMatch => "0",
        }
    }

    /// Index into per-stage counter arrays
    #[must_use]
    pub const fn counter_slot(self) -> usize {
        match self {
            Self::CookedExact => 0,
            Self::RawDirect => 1,
            Self::RawPreference => 2,
            Self::Semantic => 3,
            Self::RawConverted => 4,
            Self::BrandedScored => 5,
            Self::Decomposed => 6,
            Self::KeyedFallback => 7,
            Self::EnergyOnly => 8,
            Self::NoMatch => 9,
        }
    }

    /// Number of counter slots
    pub const COUNT: usize = 10;
}

/// Nutrient estimate attached to a result: full, energy-only, or unknown.
/// Macros are never partially estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum NutrientEstimate {
    /// Complete per-100g macro and energy profile
    Full {
        /// Per-100g profile
        per_100g: MacroProfile,
    },
    /// Energy figure only; macros explicitly unknown
    EnergyOnly {
        /// kcal per 100g, clamped to the category band
        kcal_per_100g: f64,
    },
    /// Nothing could be estimated
    Unknown,
}

impl NutrientEstimate {
    /// The per-100g profile when fully estimated
    #[must_use]
    pub const fn per_100g(&self) -> Option<&MacroProfile> {
        match self {
            Self::Full { per_100g } => Some(per_100g),
            _ => None,
        }
    }

    /// kcal/100g for both full and energy-only estimates
    #[must_use]
    pub const fn kcal_per_100g(&self) -> Option<f64> {
        match self {
            Self::Full { per_100g } => Some(per_100g.kcal),
            Self::EnergyOnly { kcal_per_100g } => Some(*kcal_per_100g),
            Self::Unknown => None,
        }
    }
}

/// Final resolver output for one detected item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentResult {
    /// Matched reference record id, when a record was admitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<u64>,
    /// Matched record name, or the (normalized) input name for terminal stages
    pub name: String,
    /// Provenance tier of the match; absent for stage 0 / energy-only results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<ProvenanceTier>,
    /// Nutrient estimate (full / energy-only / unknown)
    pub nutrients: NutrientEstimate,
    /// Lexical match score where a scored stage produced the match
    pub match_score: f64,
    /// Overall confidence in [0, 1]
    pub confidence: f64,
    /// The stage that produced this result
    pub stage: MatchStage,
    /// Cooking method attributed to the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<CookMethod>,
    /// Why that method was attributed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_reason: Option<String>,
    /// Whether the conversion engine transformed the underlying record
    pub conversion_applied: bool,
    /// Portion mass this result covers, in grams
    pub mass_g: f64,
    /// Expanded component results when the item was decomposed
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub components: Vec<AlignmentResult>,
    /// Structured accept/reject trail for this resolution
    pub trail: ResolutionTrail,
}

impl AlignmentResult {
    /// Terminal no-match result carrying the trail for diagnosis
    #[must_use]
    pub fn no_match(name: impl Into<String>, mass_g: f64, trail: ResolutionTrail) -> Self {
        Self {
            reference_id: None,
            name: name.into(),
            tier: None,
            nutrients: NutrientEstimate::Unknown,
            match_score: 0.0,
            confidence: 0.0,
            stage: MatchStage::NoMatch,
            method: None,
            method_reason: None,
            conversion_applied: false,
            mass_g,
            components: Vec::new(),
            trail,
        }
    }

    /// Total kcal for the portion, when an energy estimate exists
    #[must_use]
    pub fn portion_kcal(&self) -> Option<f64> {
        self.nutrients
            .kcal_per_100g()
            .map(|kcal| kcal * self.mass_g / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atwater_is_exact() {
        let p = MacroProfile {
            protein_g: 10.0,
            carbs_g: 20.0,
            fat_g: 5.0,
            kcal: 0.0,
            fiber_g: 0.0,
        };
        let expected = 4.0f64.mul_add(10.0, 4.0f64.mul_add(20.0, 9.0 * 5.0));
        assert!((p.atwater_kcal() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn method_compatibility_is_symmetric_and_grouped() {
        let pairs = [
            (CookMethod::Roasted, CookMethod::Baked),
            (CookMethod::Roasted, CookMethod::RoastedOven),
            (CookMethod::Grilled, CookMethod::Broiled),
            (CookMethod::PanSeared, CookMethod::Sauteed),
            (CookMethod::Boiled, CookMethod::Steamed),
        ];
        for (a, b) in pairs {
            assert!(a.is_compatible_with(b));
            assert!(b.is_compatible_with(a));
        }
        assert!(!CookMethod::Grilled.is_compatible_with(CookMethod::Boiled));
        assert!(!CookMethod::Raw.is_compatible_with(CookMethod::Fried));
    }

    #[test]
    fn classifier_buckets_specific_before_generic() {
        assert_eq!(FoodCategory::classify("peanut"), FoodCategory::NutsSeeds);
        assert_eq!(FoodCategory::classify("pea_green"), FoodCategory::Legume);
        assert_eq!(
            FoodCategory::classify("chicken_breast"),
            FoodCategory::MeatPoultry
        );
        assert_eq!(FoodCategory::classify("rice_white"), FoodCategory::StarchGrain);
        assert_eq!(FoodCategory::classify("dragonfruit"), FoodCategory::Fruit);
        assert_eq!(
            FoodCategory::classify("cherry_tomato"),
            FoodCategory::Vegetable
        );
        assert_eq!(FoodCategory::classify("eggplant"), FoodCategory::Vegetable);
        assert_eq!(FoodCategory::classify("mystery"), FoodCategory::Other);
    }

    #[test]
    fn z2_bars_produce_and_admit_protein() {
        assert!(FoodCategory::Fruit.barred_from_energy_proxy());
        assert!(FoodCategory::Vegetable.barred_from_energy_proxy());
        assert!(FoodCategory::Legume.barred_from_energy_proxy());
        assert!(FoodCategory::NutsSeeds.barred_from_energy_proxy());
        assert!(FoodCategory::MeatPoultry.energy_proxy_always_admitted());
        assert!(!FoodCategory::StarchGrain.energy_proxy_always_admitted());
    }

    #[test]
    fn predicted_energy_density_needs_mass() {
        let mut item = DetectedItem::new("rice", 0.0);
        item.kcal_hint = Some(200.0);
        assert!(item.predicted_energy_density().is_none());
        item.mass_g = 150.0;
        let density = item.predicted_energy_density().unwrap_or_default();
        assert!((density - 133.333).abs() < 0.01);
    }
}
