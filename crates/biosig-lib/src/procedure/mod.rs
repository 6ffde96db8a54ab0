//! Contract every analysis procedure satisfies.
//!
//! A procedure is described by a [`ProcedureModule`]: a plain record that a
//! factory fills in. Any field may be missing, exactly as with a plugin
//! loaded from elsewhere, so [`Procedure::from_module`] validates it before
//! the analyzer is allowed to run it.

mod arguments;
mod registry;

pub use arguments::{ArgValue, Arguments};
pub use registry::{ProcedureFactory, ProcedureRegistry};

use crate::dataset::CompositeDataset;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Filter-like procedure: samples in, same number of samples out.
pub type ModifyFn = fn(data: &[f64], sample_rate: f64, arguments: &Arguments) -> anyhow::Result<Vec<f64>>;

/// Event detector: returns `(x, y)` pairs found in `[begin, end)`.
pub type FindPointsFn = fn(
    dataset: &CompositeDataset,
    begin: f64,
    end: f64,
    arguments: &Arguments,
) -> anyhow::Result<Vec<(f64, f64)>>;

/// Parameter calculator: one value per interval, in the same order.
pub type ParameterFn = fn(
    dataset: &CompositeDataset,
    intervals: &[(f64, f64)],
    arguments: &Arguments,
) -> anyhow::Result<Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureKind {
    Modify,
    Points,
    Parameter,
}

impl ProcedureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureKind::Modify => "modify",
            ProcedureKind::Points => "points",
            ProcedureKind::Parameter => "parameter",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcedureKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "modify" => Ok(ProcedureKind::Modify),
            "points" => Ok(ProcedureKind::Points),
            "parameter" => Ok(ProcedureKind::Parameter),
            other => Err(format!("unknown procedure kind '{other}'")),
        }
    }
}

/// Entry function of a procedure; the variant must agree with its kind.
#[derive(Clone, Copy)]
pub enum Entry {
    Modify(ModifyFn),
    Points(FindPointsFn),
    Parameter(ParameterFn),
}

impl Entry {
    pub fn kind(&self) -> ProcedureKind {
        match self {
            Entry::Modify(_) => ProcedureKind::Modify,
            Entry::Points(_) => ProcedureKind::Points,
            Entry::Parameter(_) => ProcedureKind::Parameter,
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry::{}", self.kind())
    }
}

/// Unvalidated description of a procedure, as produced by a factory.
#[derive(Debug, Clone, Default)]
pub struct ProcedureModule {
    pub name: String,
    pub description: String,
    pub author: String,
    pub kind: Option<String>,
    pub default_arguments: Option<Arguments>,
    pub required_waves: Vec<String>,
    pub required_points: Vec<String>,
    /// Type tag given to the series the procedure produces.
    pub output_type: Option<String>,
    pub entry: Option<Entry>,
}

/// A validated, immutable procedure ready for the analyzer.
#[derive(Debug, Clone)]
pub struct Procedure {
    name: String,
    description: String,
    author: String,
    kind: ProcedureKind,
    default_arguments: Arguments,
    required_waves: Vec<String>,
    required_points: Vec<String>,
    output_type: Option<String>,
    entry: Entry,
}

impl Procedure {
    /// Check that the module declares a known kind, default arguments and an
    /// entry function of that kind.
    pub fn from_module(module: ProcedureModule) -> Result<Self> {
        let name = module.name;
        let kind = module
            .kind
            .as_deref()
            .ok_or_else(|| Error::contract(&name, "missing kind"))?
            .parse::<ProcedureKind>()
            .map_err(|reason| Error::contract(&name, reason))?;
        let default_arguments = module
            .default_arguments
            .ok_or_else(|| Error::contract(&name, "missing default_arguments"))?;
        let entry = module
            .entry
            .ok_or_else(|| Error::contract(&name, "missing entry function"))?;
        if entry.kind() != kind {
            return Err(Error::contract(
                &name,
                format!("declares kind '{kind}' but provides a '{}' entry", entry.kind()),
            ));
        }
        Ok(Self {
            name,
            description: module.description,
            author: module.author,
            kind,
            default_arguments,
            required_waves: module.required_waves,
            required_points: module.required_points,
            output_type: module.output_type,
            entry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Defaults to clone and override before calling the analyzer.
    pub fn default_arguments(&self) -> &Arguments {
        &self.default_arguments
    }

    pub fn required_waves(&self) -> &[String] {
        &self.required_waves
    }

    pub fn required_points(&self) -> &[String] {
        &self.required_points
    }

    /// Type tag for produced series, falling back to the procedure name.
    pub fn output_type(&self) -> &str {
        self.output_type.as_deref().unwrap_or(&self.name)
    }

    pub fn entry(&self) -> Entry {
        self.entry
    }

    pub fn info(&self) -> ProcedureInfo<'_> {
        ProcedureInfo {
            name: &self.name,
            kind: self.kind,
            description: &self.description,
            author: &self.author,
            default_arguments: &self.default_arguments,
            required_waves: &self.required_waves,
            required_points: &self.required_points,
            output_type: self.output_type(),
        }
    }
}

/// Serializable summary of a procedure, for listings.
#[derive(Debug, Serialize)]
pub struct ProcedureInfo<'a> {
    pub name: &'a str,
    pub kind: ProcedureKind,
    pub description: &'a str,
    pub author: &'a str,
    pub default_arguments: &'a Arguments,
    pub required_waves: &'a [String],
    pub required_points: &'a [String],
    pub output_type: &'a str,
}
