//! Applicability rules for tools and options.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::keys::HolderKey;
use super::BuildModel;

/// Project language natures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nature {
    C,
    Cc,
}

impl Nature {
    pub fn as_str(self) -> &'static str {
        match self {
            Nature::C => "c",
            Nature::Cc => "cc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "c" => Some(Nature::C),
            "cc" => Some(Nature::Cc),
            _ => None,
        }
    }
}

impl fmt::Display for Nature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natures a configuration's project carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNatures {
    pub c: bool,
    pub cc: bool,
}

impl Default for ProjectNatures {
    fn default() -> Self {
        Self { c: true, cc: false }
    }
}

impl ProjectNatures {
    pub fn has(&self, nature: Nature) -> bool {
        match nature {
            Nature::C => self.c,
            Nature::Cc => self.cc,
        }
    }

    pub fn from_list(natures: &[Nature]) -> Self {
        Self {
            c: natures.contains(&Nature::C),
            cc: natures.contains(&Nature::Cc),
        }
    }

    pub fn to_list(self) -> Vec<Nature> {
        let mut out = Vec::new();
        if self.c {
            out.push(Nature::C);
        }
        if self.cc {
            out.push(Nature::Cc);
        }
        out
    }
}

/// Which project natures a tool is offered for.
///
/// `C` means C-only projects: a project that also carries the C++ nature
/// gets the `Cc` tools instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NatureFilter {
    C,
    Cc,
    #[default]
    Both,
}

impl NatureFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            NatureFilter::C => "cnature",
            NatureFilter::Cc => "ccnature",
            NatureFilter::Both => "both",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cnature" => Some(NatureFilter::C),
            "ccnature" => Some(NatureFilter::Cc),
            "both" => Some(NatureFilter::Both),
            _ => None,
        }
    }

    pub fn accepts(self, natures: ProjectNatures) -> bool {
        match self {
            NatureFilter::Both => true,
            NatureFilter::C => !natures.cc,
            NatureFilter::Cc => natures.cc,
        }
    }
}

/// Boolean expression deciding whether a tool or option applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Enablement {
    /// The holder's option (matched through its superclass chain) has this
    /// flat value.
    CheckOption { option_id: String, value: String },
    CheckNature { nature: Nature },
    All { terms: Vec<Enablement> },
    Any { terms: Vec<Enablement> },
    Not { term: Box<Enablement> },
}

impl BuildModel {
    /// Evaluate `rule` in the context of `holder`.
    ///
    /// Nature checks pass for holders outside any configuration.
    pub fn evaluate(&self, rule: &Enablement, holder: HolderKey) -> bool {
        match rule {
            Enablement::CheckOption { option_id, value } => self
                .merged_options(holder)
                .into_iter()
                .find(|o| self.option_chain_contains(*o, option_id))
                .and_then(|o| self.option_value(o))
                .map(|v| v.to_raw() == *value)
                .unwrap_or(false),
            Enablement::CheckNature { nature } => match self.config_of(holder.into()) {
                Some(cfg) => self.configuration(cfg).natures.has(*nature),
                None => true,
            },
            Enablement::All { terms } => terms.iter().all(|t| self.evaluate(t, holder)),
            Enablement::Any { terms } => terms.iter().any(|t| self.evaluate(t, holder)),
            Enablement::Not { term } => !self.evaluate(term, holder),
        }
    }
}
