//! Risk-profile questionnaire.
//!
//! Captures the answers a clinician gives on the eligibility form and derives the selected
//! condition keys from them. At most one key is produced per risk-factor group, except VTE
//! where every ticked item contributes its own key.

use crate::constants::{
    PROFILE_AGE_MAX, PROFILE_AGE_MIN, PROFILE_BMI_MAX, PROFILE_BMI_MIN,
    PROFILE_BREASTFEEDING_WEEKS_MAX, PROFILE_CIGARETTES_MAX, PROFILE_POSTPARTUM_WEEKS_MAX,
};
use crate::{CdsError, CdsResult};
use serde::{Deserialize, Serialize};

/// Answers from the eligibility form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskProfile {
    /// Age in years.
    pub age: u32,
    /// Body mass index, kg/m².
    pub bmi: f64,
    #[serde(default)]
    pub smoking: Option<Smoking>,
    #[serde(default)]
    pub postpartum: Option<Postpartum>,
    #[serde(default)]
    pub post_abortion: Option<PostAbortion>,
    #[serde(default)]
    pub past_ectopic: bool,
    #[serde(default)]
    pub hypertension: Option<Hypertension>,
    #[serde(default)]
    pub diabetes: Option<Diabetes>,
    #[serde(default)]
    pub migraine: Option<Migraine>,
    #[serde(default)]
    pub vte: Vec<VteRisk>,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self {
            age: 25,
            bmi: 25.0,
            smoking: None,
            postpartum: None,
            post_abortion: None,
            past_ectopic: false,
            hypertension: None,
            diabetes: None,
            migraine: None,
            vte: Vec::new(),
        }
    }
}

/// Current or former smoker.
///
/// For patients aged 35 or over, zero cigarettes a day marks an ex-smoker and
/// `stopped_within_year` decides between the two ex-smoker keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Smoking {
    pub aged_35_or_over: bool,
    #[serde(default)]
    pub cigarettes_per_day: u32,
    #[serde(default)]
    pub stopped_within_year: bool,
}

/// Postpartum within six months.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Postpartum {
    pub breastfeeding: bool,
    pub weeks: u32,
    /// Immobility, postpartum haemorrhage and similar. Only read when not breastfeeding.
    #[serde(default)]
    pub additional_vte_risk: bool,
    #[serde(default)]
    pub sepsis: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trimester {
    First,
    Second,
}

/// Abortion under 24 weeks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostAbortion {
    pub trimester: Trimester,
    #[serde(default)]
    pub sepsis: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hypertension {
    AdequatelyControlled,
    /// Systolic 140-159 or diastolic 90-99 mmHg.
    Elevated,
    /// Systolic ≥160 or diastolic ≥100 mmHg.
    Severe,
    VascularDisease,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diabetes {
    GestationalOnly,
    NonVascularNonInsulin,
    NonVascularInsulin,
    /// Nephropathy, retinopathy or neuropathy.
    Neuropathic,
    OtherVascular,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Migraine {
    pub with_aura: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VteRisk {
    History,
    /// Current VTE on anticoagulants.
    Current,
    /// Family history in a first-degree relative under 45.
    #[serde(rename = "family_history_under_45")]
    FamilyHistoryUnder45,
    #[serde(rename = "family_history_45_or_over")]
    FamilyHistory45OrOver,
    MajorSurgeryProlongedImmobilisation,
    MajorSurgeryNoProlongedImmobilisation,
    MinorSurgeryNoImmobilisation,
    ChronicImmobility,
    SuperficialVaricoseVeins,
    SuperficialVenousThrombosis,
    ThrombogenicMutation,
}

impl VteRisk {
    pub const ALL: [VteRisk; 11] = [
        VteRisk::History,
        VteRisk::Current,
        VteRisk::FamilyHistoryUnder45,
        VteRisk::FamilyHistory45OrOver,
        VteRisk::MajorSurgeryProlongedImmobilisation,
        VteRisk::MajorSurgeryNoProlongedImmobilisation,
        VteRisk::MinorSurgeryNoImmobilisation,
        VteRisk::ChronicImmobility,
        VteRisk::SuperficialVaricoseVeins,
        VteRisk::SuperficialVenousThrombosis,
        VteRisk::ThrombogenicMutation,
    ];

    pub fn condition_key(self) -> &'static str {
        match self {
            VteRisk::History => "VTE_HISTORY",
            VteRisk::Current => "VTE_CURRENT",
            VteRisk::FamilyHistoryUnder45 => "VTE_FHX_1ST_LT45",
            VteRisk::FamilyHistory45OrOver => "VTE_FHX_1ST_GE45",
            VteRisk::MajorSurgeryProlongedImmobilisation => "VTE_MAJ_SURG_IMMOBIL",
            VteRisk::MajorSurgeryNoProlongedImmobilisation => "VTE_MAJ_SURG_NO_IMMOB",
            VteRisk::MinorSurgeryNoImmobilisation => "VTE_MINOR_SURG_NO_IMMOB",
            VteRisk::ChronicImmobility => "VTE_IMMOBILITY",
            VteRisk::SuperficialVaricoseVeins => "SVT_VARICOSE",
            VteRisk::SuperficialVenousThrombosis => "SVT_THROMBOSIS",
            VteRisk::ThrombogenicMutation => "THROMBO_MUTATION",
        }
    }
}

impl RiskProfile {
    /// Check every numeric answer against the form's bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CdsError::InvalidInput`] naming the first out-of-range answer.
    pub fn validate(&self) -> CdsResult<()> {
        if !(PROFILE_AGE_MIN..=PROFILE_AGE_MAX).contains(&self.age) {
            return Err(CdsError::InvalidInput(format!(
                "age must be between {PROFILE_AGE_MIN} and {PROFILE_AGE_MAX}"
            )));
        }

        if !self.bmi.is_finite() || !(PROFILE_BMI_MIN..=PROFILE_BMI_MAX).contains(&self.bmi) {
            return Err(CdsError::InvalidInput(format!(
                "BMI must be between {PROFILE_BMI_MIN} and {PROFILE_BMI_MAX}"
            )));
        }

        if let Some(smoking) = &self.smoking {
            if smoking.cigarettes_per_day > PROFILE_CIGARETTES_MAX {
                return Err(CdsError::InvalidInput(format!(
                    "cigarettes per day cannot exceed {PROFILE_CIGARETTES_MAX}"
                )));
            }
        }

        if let Some(pp) = &self.postpartum {
            let max = if pp.breastfeeding {
                PROFILE_BREASTFEEDING_WEEKS_MAX
            } else {
                PROFILE_POSTPARTUM_WEEKS_MAX
            };
            if pp.weeks > max {
                return Err(CdsError::InvalidInput(format!(
                    "weeks postpartum cannot exceed {max}"
                )));
            }
        }

        Ok(())
    }

    /// Derive the selected condition keys, in form order.
    ///
    /// Assumes [`RiskProfile::validate`] has passed; out-of-range values still map to a key.
    pub fn condition_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();

        keys.push(if self.age < 20 {
            "AGE_MENARCHE_LT_20"
        } else {
            "AGE_GE_20"
        });

        if let Some(smoking) = &self.smoking {
            keys.push(match smoking {
                Smoking {
                    aged_35_or_over: false,
                    ..
                } => "SMOKE_LT_35",
                Smoking {
                    cigarettes_per_day: 0,
                    stopped_within_year: true,
                    ..
                } => "SMOKE_GE_35_STOP_LT1",
                Smoking {
                    cigarettes_per_day: 0,
                    ..
                } => "SMOKE_GE_35_STOP_GE1",
                Smoking {
                    cigarettes_per_day: 1..=14,
                    ..
                } => "SMOKE_GE_35_LT15",
                _ => "SMOKE_GE_35_GE15",
            });
        }

        if self.bmi >= 35.0 {
            keys.push("BMI_GE_35");
        } else if self.bmi >= 30.0 {
            keys.push("BMI_30_34");
        }

        if let Some(pp) = &self.postpartum {
            keys.push(match (pp.breastfeeding, pp.weeks, pp.additional_vte_risk) {
                (true, 0..=5, _) => "BREASTFEEDING_0_TO_6_WEEKS",
                (true, _, _) => "BREASTFEEDING_6W_TO_6M",
                (false, 0..=2, true) => "PP_NB_0_TO_3_WEEKS_VTE_RISK",
                (false, 0..=2, false) => "PP_NB_0_TO_3_WEEKS_NO_VTE",
                (false, 3..=5, true) => "PP_NB_3_TO_6_WEEKS_VTE_RISK",
                (false, 3..=5, false) => "PP_NB_3_TO_6_WEEKS_NO_VTE",
                (false, _, _) => "PP_NB_GE_6_WEEKS",
            });
            if pp.sepsis {
                keys.push("PP_SEPSIS");
            }
        }

        if let Some(ab) = &self.post_abortion {
            keys.push(match ab.trimester {
                Trimester::First => "POSTABORTION_1T",
                Trimester::Second => "POSTABORTION_2T",
            });
            if ab.sepsis {
                keys.push("POSTABORTION_SEPSIS");
            }
        }

        if self.past_ectopic {
            keys.push("PAST_ECTOPIC");
        }

        if let Some(htn) = self.hypertension {
            keys.push(match htn {
                Hypertension::AdequatelyControlled => "HTN_ADEQUATELY_CONTROLLED",
                Hypertension::Elevated => "HTN_SYSTOLIC_140_159_OR_DIA_90_99",
                Hypertension::Severe => "HTN_SYSTOLIC_GE160_OR_DIA_GE100",
                Hypertension::VascularDisease => "HTN_VASCULAR",
            });
        }

        if let Some(dm) = self.diabetes {
            keys.push(match dm {
                Diabetes::GestationalOnly => "DM_GESTATIONAL",
                Diabetes::NonVascularNonInsulin => "DM_NON_VASC_NON_INSULIN",
                Diabetes::NonVascularInsulin => "DM_NON_VASC_INSULIN",
                Diabetes::Neuropathic => "DM_NEURO_VASC",
                Diabetes::OtherVascular => "DM_OTHER_VASC",
            });
        }

        if let Some(migraine) = self.migraine {
            keys.push(if migraine.with_aura {
                "MIGRAINE_WITH_AURA"
            } else {
                "MIGRAINE_NO_AURA"
            });
        }

        // Multi-select: report in the form's fixed order, once each.
        for risk in VteRisk::ALL {
            if self.vte.contains(&risk) {
                keys.push(risk.condition_key());
            }
        }

        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityTable;

    fn smoker(aged_35_or_over: bool, cigarettes_per_day: u32, stopped_within_year: bool) -> RiskProfile {
        RiskProfile {
            smoking: Some(Smoking {
                aged_35_or_over,
                cigarettes_per_day,
                stopped_within_year,
            }),
            ..RiskProfile::default()
        }
    }

    #[test]
    fn default_profile_only_has_age_key() {
        assert_eq!(RiskProfile::default().condition_keys(), vec!["AGE_GE_20"]);
    }

    #[test]
    fn teenagers_get_menarche_key() {
        let profile = RiskProfile {
            age: 17,
            ..RiskProfile::default()
        };
        assert_eq!(profile.condition_keys()[0], "AGE_MENARCHE_LT_20");
    }

    #[test]
    fn smoking_keys_follow_age_and_volume() {
        assert_eq!(smoker(false, 30, false).condition_keys()[1], "SMOKE_LT_35");
        assert_eq!(smoker(true, 14, false).condition_keys()[1], "SMOKE_GE_35_LT15");
        assert_eq!(smoker(true, 15, false).condition_keys()[1], "SMOKE_GE_35_GE15");
        assert_eq!(smoker(true, 0, true).condition_keys()[1], "SMOKE_GE_35_STOP_LT1");
        assert_eq!(smoker(true, 0, false).condition_keys()[1], "SMOKE_GE_35_STOP_GE1");
    }

    #[test]
    fn bmi_bands() {
        let at = |bmi: f64| {
            RiskProfile {
                bmi,
                ..RiskProfile::default()
            }
            .condition_keys()
        };
        assert_eq!(at(29.9), vec!["AGE_GE_20"]);
        assert_eq!(at(30.0), vec!["AGE_GE_20", "BMI_30_34"]);
        assert_eq!(at(34.9), vec!["AGE_GE_20", "BMI_30_34"]);
        assert_eq!(at(35.0), vec!["AGE_GE_20", "BMI_GE_35"]);
    }

    #[test]
    fn postpartum_keys() {
        let pp = |breastfeeding: bool, weeks: u32, additional_vte_risk: bool| {
            RiskProfile {
                postpartum: Some(Postpartum {
                    breastfeeding,
                    weeks,
                    additional_vte_risk,
                    sepsis: false,
                }),
                ..RiskProfile::default()
            }
            .condition_keys()[1]
        };
        assert_eq!(pp(true, 5, false), "BREASTFEEDING_0_TO_6_WEEKS");
        assert_eq!(pp(true, 6, false), "BREASTFEEDING_6W_TO_6M");
        assert_eq!(pp(false, 2, true), "PP_NB_0_TO_3_WEEKS_VTE_RISK");
        assert_eq!(pp(false, 2, false), "PP_NB_0_TO_3_WEEKS_NO_VTE");
        assert_eq!(pp(false, 3, true), "PP_NB_3_TO_6_WEEKS_VTE_RISK");
        assert_eq!(pp(false, 5, false), "PP_NB_3_TO_6_WEEKS_NO_VTE");
        assert_eq!(pp(false, 6, true), "PP_NB_GE_6_WEEKS");
    }

    #[test]
    fn sepsis_adds_separate_keys() {
        let profile = RiskProfile {
            postpartum: Some(Postpartum {
                breastfeeding: true,
                weeks: 10,
                additional_vte_risk: false,
                sepsis: true,
            }),
            post_abortion: Some(PostAbortion {
                trimester: Trimester::Second,
                sepsis: true,
            }),
            ..RiskProfile::default()
        };
        assert_eq!(
            profile.condition_keys(),
            vec![
                "AGE_GE_20",
                "BREASTFEEDING_6W_TO_6M",
                "PP_SEPSIS",
                "POSTABORTION_2T",
                "POSTABORTION_SEPSIS"
            ]
        );
    }

    #[test]
    fn vte_multi_select_is_ordered_and_deduplicated() {
        let profile = RiskProfile {
            vte: vec![
                VteRisk::ThrombogenicMutation,
                VteRisk::History,
                VteRisk::History,
            ],
            ..RiskProfile::default()
        };
        assert_eq!(
            profile.condition_keys(),
            vec!["AGE_GE_20", "VTE_HISTORY", "THROMBO_MUTATION"]
        );
    }

    #[test]
    fn every_derivable_key_is_in_the_table() {
        let table = EligibilityTable::ukmec().unwrap();
        let mut profiles = vec![RiskProfile {
            age: 15,
            bmi: 31.0,
            past_ectopic: true,
            migraine: Some(Migraine { with_aura: true }),
            vte: VteRisk::ALL.to_vec(),
            ..RiskProfile::default()
        }];
        for htn in [
            Hypertension::AdequatelyControlled,
            Hypertension::Elevated,
            Hypertension::Severe,
            Hypertension::VascularDisease,
        ] {
            profiles.push(RiskProfile {
                hypertension: Some(htn),
                ..RiskProfile::default()
            });
        }
        for dm in [
            Diabetes::GestationalOnly,
            Diabetes::NonVascularNonInsulin,
            Diabetes::NonVascularInsulin,
            Diabetes::Neuropathic,
            Diabetes::OtherVascular,
        ] {
            profiles.push(RiskProfile {
                diabetes: Some(dm),
                migraine: Some(Migraine { with_aura: false }),
                post_abortion: Some(PostAbortion {
                    trimester: Trimester::First,
                    sepsis: false,
                }),
                ..RiskProfile::default()
            });
        }
        for profile in profiles {
            for key in profile.condition_keys() {
                assert!(table.contains(key), "{key} missing from table");
            }
        }
    }

    #[test]
    fn validate_enforces_form_bounds() {
        assert!(RiskProfile::default().validate().is_ok());
        assert!(RiskProfile {
            age: 9,
            ..RiskProfile::default()
        }
        .validate()
        .is_err());
        assert!(RiskProfile {
            bmi: 70.5,
            ..RiskProfile::default()
        }
        .validate()
        .is_err());
        assert!(RiskProfile {
            bmi: f64::NAN,
            ..RiskProfile::default()
        }
        .validate()
        .is_err());
        assert!(smoker(true, 51, false).validate().is_err());

        let breastfeeding_late = RiskProfile {
            postpartum: Some(Postpartum {
                breastfeeding: true,
                weeks: 30,
                additional_vte_risk: false,
                sepsis: false,
            }),
            ..RiskProfile::default()
        };
        assert!(breastfeeding_late.validate().is_err());
    }

    #[test]
    fn deserialises_from_form_json() {
        let json = r#"{
            "age": 38,
            "bmi": 27.5,
            "smoking": { "aged_35_or_over": true, "cigarettes_per_day": 20 },
            "hypertension": "severe",
            "vte": ["family_history_under_45"]
        }"#;
        let profile: RiskProfile = serde_json::from_str(json).expect("valid profile json");
        assert_eq!(
            profile.condition_keys(),
            vec![
                "AGE_GE_20",
                "SMOKE_GE_35_GE15",
                "HTN_SYSTOLIC_GE160_OR_DIA_GE100",
                "VTE_FHX_1ST_LT45"
            ]
        );
    }
}
