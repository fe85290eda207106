//! # Validation Stage Mapping
//!
//! Read-only categorization of engagement progress, derived from an external
//! phase and status. Stages are informational: they never gate any operation.
//!
//! ## Stage Definitions
//!
//! | Stage | Name | Typical duration |
//! |-------|------|------------------|
//! | stage0-1 | Discovery & Alignment | 1-2 weeks |
//! | stage2 | Non-POV Technical Validation | 1-2 weeks |
//! | stage3 | POV Planning | 1 week |
//! | stage4 | POV Technical Validation & Execution | 2-4 weeks |
//! | stage7 | Tech Win - Closed | 3-5 days |
//! | stage8 | DC Close Out | 1 week |

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Engagement validation stage. Numbering follows the sales playbook, which
/// has no stages 5 and 6 on the technical track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValidationStage {
    #[serde(rename = "stage0-1")]
    Stage0_1,
    #[serde(rename = "stage2")]
    Stage2,
    #[serde(rename = "stage3")]
    Stage3,
    #[serde(rename = "stage4")]
    Stage4,
    #[serde(rename = "stage7")]
    Stage7,
    #[serde(rename = "stage8")]
    Stage8,
}

/// Static description of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub duration: &'static str,
    pub key_activities: &'static [&'static str],
    pub deliverables: &'static [&'static str],
    pub exit_criteria: &'static [&'static str],
}

const DISCOVERY: StageDefinition = StageDefinition {
    name: "Discovery & Alignment",
    description: "Opportunity alignment and technical discovery",
    duration: "1-2 weeks",
    key_activities: &[
        "Executive engagement",
        "Discovery workshop",
        "Business value definition",
        "SOC team commitment",
    ],
    deliverables: &[
        "Business Value Framework",
        "Use Case Mapping",
        "Success Criteria",
    ],
    exit_criteria: &[
        "Executive sponsorship secured",
        "SOC team engaged",
        "Business value defined",
    ],
};

const PRE_POV: StageDefinition = StageDefinition {
    name: "Non-POV Technical Validation",
    description: "Pre-POV validation through demos and workshops",
    duration: "1-2 weeks",
    key_activities: &["Targeted demos", "Executive briefings", "Hands-on workshops"],
    deliverables: &["Technical capability validation", "Stakeholder buy-in"],
    exit_criteria: &["Decision to proceed with full POV"],
};

const POV_PLANNING: StageDefinition = StageDefinition {
    name: "POV Planning",
    description: "POV test plan and logistics setup",
    duration: "1 week",
    key_activities: &[
        "Test plan creation",
        "Logistics setup",
        "Scenario selection",
        "Day One configuration",
    ],
    deliverables: &[
        "POV Test Plan",
        "Schedule",
        "Success Metrics",
        "Tenant Configuration",
    ],
    exit_criteria: &["Internal POV huddle complete", "Customer access granted"],
};

const POV_EXECUTION: StageDefinition = StageDefinition {
    name: "POV Technical Validation & Execution",
    description: "Core POV execution with hands-on testing",
    duration: "2-4 weeks",
    key_activities: &[
        "Scenario deployment",
        "Hands-on testing",
        "Data ingestion",
        "Metric capture",
    ],
    deliverables: &[
        "Validated scenarios",
        "Performance metrics",
        "MITRE coverage dashboard",
    ],
    exit_criteria: &["All success criteria met", "Evidence captured"],
};

const TECH_WIN: StageDefinition = StageDefinition {
    name: "Tech Win - Closed",
    description: "POV readout and business case presentation",
    duration: "3-5 days",
    key_activities: &[
        "POV readout generation",
        "Business outcomes mapping",
        "MITRE dashboard export",
    ],
    deliverables: &["Executive Readout", "Technical Report", "Business Case"],
    exit_criteria: &["Customer acceptance", "Technical win confirmed"],
};

const CLOSE_OUT: StageDefinition = StageDefinition {
    name: "DC Close Out",
    description: "PS handoff and final documentation",
    duration: "1 week",
    key_activities: &["SDW/DOR finalization", "PS handoff", "Blueprint generation"],
    deliverables: &["Design of Record", "Blueprint", "Lessons Learned"],
    exit_criteria: &["Clean handoff to PS/CSM"],
};

impl ValidationStage {
    pub const ALL: [Self; 6] = [
        Self::Stage0_1,
        Self::Stage2,
        Self::Stage3,
        Self::Stage4,
        Self::Stage7,
        Self::Stage8,
    ];

    /// Stage used for any phase the mapper does not recognize.
    pub const DEFAULT: Self = Self::Stage3;

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Stage0_1 => "stage0-1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
            Self::Stage4 => "stage4",
            Self::Stage7 => "stage7",
            Self::Stage8 => "stage8",
        }
    }

    #[must_use]
    pub const fn definition(self) -> &'static StageDefinition {
        match self {
            Self::Stage0_1 => &DISCOVERY,
            Self::Stage2 => &PRE_POV,
            Self::Stage3 => &POV_PLANNING,
            Self::Stage4 => &POV_EXECUTION,
            Self::Stage7 => &TECH_WIN,
            Self::Stage8 => &CLOSE_OUT,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.definition().name
    }

    /// Next stage in playbook order, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Stage0_1 => Some(Self::Stage2),
            Self::Stage2 => Some(Self::Stage3),
            Self::Stage3 => Some(Self::Stage4),
            Self::Stage4 => Some(Self::Stage7),
            Self::Stage7 => Some(Self::Stage8),
            Self::Stage8 => None,
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.name())
    }
}

// =============================================================================
// DERIVATION
// =============================================================================

/// Map an external `(phase, status)` pair to a validation stage.
///
/// Total: every input yields a stage. Matching is exact.
///
/// | phase | status | stage |
/// |-------|--------|-------|
/// | discovery | any | stage0-1 |
/// | design | any | stage2 |
/// | deployment | any | stage3 |
/// | validation, demonstration | any | stage4 |
/// | closure | completed | stage7 |
/// | closure | other | stage8 |
/// | other | any | stage3 |
#[must_use]
pub fn derive_stage(phase: &str, status: &str) -> ValidationStage {
    match phase {
        "discovery" => ValidationStage::Stage0_1,
        "design" => ValidationStage::Stage2,
        "deployment" => ValidationStage::Stage3,
        "validation" | "demonstration" => ValidationStage::Stage4,
        "closure" if status == "completed" => ValidationStage::Stage7,
        "closure" => ValidationStage::Stage8,
        _ => ValidationStage::DEFAULT,
    }
}
