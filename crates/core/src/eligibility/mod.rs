//! Contraceptive eligibility engine.
//!
//! Maps a set of condition keys to a UKMEC category for each contraceptive method. The rule
//! data lives in a declarative [`EligibilityTable`]; this module holds the closed set of
//! methods, the category scale and the combination result.
//!
//! Combination is a plain per-method maximum. When several category 2 or 3 conditions bear
//! on the same risk factor, guidance may call for escalation beyond the maximum. The engine
//! does not do that; shells display [`ESCALATION_NOTICE`] instead.

pub mod profile;
pub mod table;

pub use profile::RiskProfile;
pub use table::{ConditionRow, EligibilityTable};

use crate::{CdsError, CdsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Advisory text shown alongside every eligibility result.
pub const ESCALATION_NOTICE: &str = "If multiple Category 2 or 3 conditions overlap (especially \
for the same risk), consider escalating the category. Always compare these results with official \
guidance and use clinical judgement.";

/// A contraceptive method covered by the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "Cu-IUD")]
    CuIud,
    #[serde(rename = "LNG-IUD")]
    LngIud,
    #[serde(rename = "IMP")]
    Implant,
    #[serde(rename = "DMPA")]
    Dmpa,
    #[serde(rename = "POP")]
    Pop,
    #[serde(rename = "CHC")]
    Chc,
}

impl Method {
    /// Every method, in display order.
    pub const ALL: [Method; 6] = [
        Method::CuIud,
        Method::LngIud,
        Method::Implant,
        Method::Dmpa,
        Method::Pop,
        Method::Chc,
    ];

    /// Short code used in the table and on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Method::CuIud => "Cu-IUD",
            Method::LngIud => "LNG-IUD",
            Method::Implant => "IMP",
            Method::Dmpa => "DMPA",
            Method::Pop => "POP",
            Method::Chc => "CHC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Method::CuIud => "Copper intrauterine device",
            Method::LngIud => "Levonorgestrel intrauterine system",
            Method::Implant => "Progestogen-only implant",
            Method::Dmpa => "Progestogen-only injectable",
            Method::Pop => "Progestogen-only pill",
            Method::Chc => "Combined hormonal contraception",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Method {
    type Err = CdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Method::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CdsError::UnknownMethod(s.to_string()))
    }
}

/// UKMEC category, 1 (no restriction) to 4 (unacceptable health risk).
///
/// Ordering follows restrictiveness, so `max` picks the more restrictive category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Category(u8);

impl Category {
    pub const UNRESTRICTED: Category = Category(1);
    pub const BENEFITS_OUTWEIGH_RISKS: Category = Category(2);
    pub const RISKS_OUTWEIGH_BENEFITS: Category = Category(3);
    pub const UNACCEPTABLE_RISK: Category = Category(4);

    /// Create a category, rejecting values outside 1..=4.
    pub fn new(value: u8) -> CdsResult<Self> {
        if (1..=4).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CdsError::InvalidCategory(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// UKMEC definition of this category.
    pub fn definition(self) -> &'static str {
        match self.0 {
            1 => "A condition for which there is no restriction for the use of the method.",
            2 => "A condition where the advantages of using the method generally outweigh the \
                  theoretical or proven risks.",
            3 => "A condition where the theoretical or proven risks usually outweigh the \
                  advantages of using the method. The provision of a method requires expert \
                  clinical judgement and/or referral to a specialist contraceptive provider, \
                  since use of the method is not usually recommended unless other more \
                  appropriate methods are not available or not acceptable.",
            _ => "A condition which represents an unacceptable health risk if the method is used.",
        }
    }

    /// Whether this category falls in the 2-3 band where overlapping conditions may warrant
    /// escalation.
    pub fn is_intermediate(self) -> bool {
        matches!(self.0, 2 | 3)
    }
}

impl TryFrom<u8> for Category {
    type Error = CdsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Category::new(value)
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Combined category for every method.
///
/// Always complete: a method no selected condition touches reads as category 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MethodCategories(BTreeMap<Method, Category>);

impl MethodCategories {
    /// All methods at category 1.
    pub fn unrestricted() -> Self {
        Self(
            Method::ALL
                .into_iter()
                .map(|m| (m, Category::UNRESTRICTED))
                .collect(),
        )
    }

    pub fn get(&self, method: Method) -> Category {
        self.0
            .get(&method)
            .copied()
            .unwrap_or(Category::UNRESTRICTED)
    }

    /// Iterate methods in display order with their category.
    pub fn iter(&self) -> impl Iterator<Item = (Method, Category)> + '_ {
        self.0.iter().map(|(m, c)| (*m, *c))
    }

    /// Most restrictive category across all methods.
    pub fn highest(&self) -> Category {
        self.0
            .values()
            .copied()
            .max()
            .unwrap_or(Category::UNRESTRICTED)
    }

    pub(crate) fn raise(&mut self, method: Method, category: Category) {
        let slot = self.0.entry(method).or_insert(Category::UNRESTRICTED);
        *slot = (*slot).max(category);
    }
}

impl Default for MethodCategories {
    fn default() -> Self {
        Self::unrestricted()
    }
}

/// Validate a risk profile, derive its condition keys and combine them.
///
/// Returns the derived keys alongside the categories so shells can show both.
///
/// # Errors
///
/// Returns [`CdsError::InvalidInput`] if any numeric answer in the profile is out of bounds.
pub fn assess(
    table: &EligibilityTable,
    profile: &RiskProfile,
) -> CdsResult<(Vec<&'static str>, MethodCategories)> {
    profile.validate()?;
    let keys = profile.condition_keys();
    let categories = table.combine(&keys);
    Ok((keys, categories))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> EligibilityTable {
        EligibilityTable::ukmec().expect("embedded table loads")
    }

    fn all_keys() -> Vec<String> {
        table().keys().map(str::to_string).collect()
    }

    #[test]
    fn empty_selection_is_unrestricted() {
        let result = table().combine(Vec::<&str>::new());
        assert_eq!(result, MethodCategories::unrestricted());
        for method in Method::ALL {
            assert_eq!(result.get(method), Category::UNRESTRICTED);
        }
    }

    #[test]
    fn bmi_35_restricts_only_chc() {
        let result = table().combine(["BMI_GE_35"]);
        assert_eq!(result.get(Method::Chc).value(), 3);
        for method in Method::ALL.into_iter().filter(|m| *m != Method::Chc) {
            assert_eq!(result.get(method).value(), 1, "{method}");
        }
    }

    #[test]
    fn early_breastfeeding_is_category_4_for_pop_and_chc() {
        let result = table().combine(["BREASTFEEDING_0_TO_6_WEEKS"]);
        assert_eq!(result.get(Method::Pop).value(), 4);
        assert_eq!(result.get(Method::Chc).value(), 4);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let result = table().combine(["NOT_A_CONDITION", "BMI_30_34"]);
        assert_eq!(result, table().combine(["BMI_30_34"]));
    }

    #[test]
    fn combination_takes_plain_maximum_without_escalation() {
        // Three category 2/3 CHC conditions still land on 3, never 4.
        let result = table().combine(["BMI_GE_35", "SMOKE_GE_35_LT15", "VTE_FHX_1ST_LT45"]);
        assert_eq!(result.get(Method::Chc).value(), 3);
    }

    #[test]
    fn result_covers_every_method() {
        let result = table().combine(["PP_SEPSIS"]);
        let methods: Vec<Method> = result.iter().map(|(m, _)| m).collect();
        assert_eq!(methods, Method::ALL.to_vec());
        assert_eq!(result.get(Method::CuIud).value(), 4);
        assert_eq!(result.highest().value(), 4);
    }

    #[test]
    fn assess_derives_keys_and_combines() {
        let profile = RiskProfile {
            age: 36,
            bmi: 36.0,
            ..RiskProfile::default()
        };
        let (keys, categories) = assess(&table(), &profile).expect("valid profile");
        assert_eq!(keys, vec!["AGE_GE_20", "BMI_GE_35"]);
        assert_eq!(categories.get(Method::Chc).value(), 3);
    }

    #[test]
    fn assess_rejects_out_of_range_profile() {
        let profile = RiskProfile {
            age: 75,
            ..RiskProfile::default()
        };
        let err = assess(&table(), &profile).expect_err("age out of range");
        assert!(matches!(err, CdsError::InvalidInput(_)));
    }

    #[test]
    fn method_parses_from_code() {
        assert_eq!("CHC".parse::<Method>().unwrap(), Method::Chc);
        assert_eq!("cu-iud".parse::<Method>().unwrap(), Method::CuIud);
        assert!(matches!(
            "pill".parse::<Method>(),
            Err(CdsError::UnknownMethod(_))
        ));
    }

    #[test]
    fn category_rejects_out_of_range_values() {
        assert!(Category::new(0).is_err());
        assert!(Category::new(5).is_err());
        assert_eq!(Category::new(4).unwrap(), Category::UNACCEPTABLE_RISK);
        assert!(Category::BENEFITS_OUTWEIGH_RISKS.is_intermediate());
        assert!(!Category::UNACCEPTABLE_RISK.is_intermediate());
    }

    #[test]
    fn categories_serialise_as_method_codes() {
        let result = table().combine(["BMI_GE_35"]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["CHC"], 3);
        assert_eq!(json["Cu-IUD"], 1);
    }

    fn subset() -> impl Strategy<Value = Vec<String>> {
        let keys = all_keys();
        proptest::sample::subsequence(keys.clone(), 0..=keys.len())
    }

    proptest! {
        #[test]
        fn combine_is_pointwise_maximum(selected in subset()) {
            let table = table();
            let result = table.combine(&selected);
            for method in Method::ALL {
                let expected = selected
                    .iter()
                    .filter_map(|k| table.row(k))
                    .map(|row| row.category_for(method))
                    .max()
                    .unwrap_or(Category::UNRESTRICTED);
                prop_assert_eq!(result.get(method), expected);
                prop_assert!((1..=4).contains(&result.get(method).value()));
            }
        }

        #[test]
        fn duplicates_do_not_change_result(selected in subset()) {
            let table = table();
            let doubled: Vec<&String> = selected.iter().chain(selected.iter()).collect();
            prop_assert_eq!(table.combine(&selected), table.combine(doubled));
        }

        #[test]
        fn adding_a_condition_never_lowers_a_category(
            selected in subset(),
            extra in proptest::sample::select(all_keys()),
        ) {
            let table = table();
            let before = table.combine(&selected);
            let mut grown = selected.clone();
            grown.push(extra);
            let after = table.combine(&grown);
            for method in Method::ALL {
                prop_assert!(after.get(method) >= before.get(method));
            }
        }

        #[test]
        fn selection_order_is_irrelevant(selected in subset()) {
            let table = table();
            let mut reversed = selected.clone();
            reversed.reverse();
            prop_assert_eq!(table.combine(&selected), table.combine(&reversed));
        }
    }
}
