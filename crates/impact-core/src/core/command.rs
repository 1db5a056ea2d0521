//! Typed engine commands.
//!
//! Every directive the orchestrator sends to the engine is one variant of [`Command`].
//! The [`fmt::Display`] implementation is the only place where engine grammar is produced,
//! and [`Command::defines`] / [`Command::references`] expose the names each command creates
//! or depends on so a session can check ordering before anything is sent.

use super::value::Value;
use std::fmt;
use std::path::PathBuf;

/// Execution backend the engine accelerates its styles with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Gpu,
    Omp { threads: u32 },
}

impl Backend {
    fn suffix(&self) -> &'static str {
        match self {
            Backend::Gpu => "gpu",
            Backend::Omp { .. } => "omp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStyle {
    Lj,
    Real,
    Metal,
    Si,
}

impl UnitStyle {
    fn as_str(&self) -> &'static str {
        match self {
            UnitStyle::Lj => "lj",
            UnitStyle::Real => "real",
            UnitStyle::Metal => "metal",
            UnitStyle::Si => "si",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Periodic,
    Fixed,
    Shrink,
    /// Shrink-wrapped with a minimum extent.
    ShrinkMin,
}

impl BoundaryKind {
    fn as_str(&self) -> &'static str {
        match self {
            BoundaryKind::Periodic => "p",
            BoundaryKind::Fixed => "f",
            BoundaryKind::Shrink => "s",
            BoundaryKind::ShrinkMin => "m",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomStyle {
    Atomic,
    Charge,
    Full,
}

impl AtomStyle {
    fn as_str(&self) -> &'static str {
        match self {
            AtomStyle::Atomic => "atomic",
            AtomStyle::Charge => "charge",
            AtomStyle::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatticeStyle {
    Sc,
    Bcc,
    Fcc,
    Diamond,
}

impl LatticeStyle {
    fn as_str(&self) -> &'static str {
        match self {
            LatticeStyle::Sc => "sc",
            LatticeStyle::Bcc => "bcc",
            LatticeStyle::Fcc => "fcc",
            LatticeStyle::Diamond => "diamond",
        }
    }
}

/// Crystallographic orientation of the lattice along the box axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub x: [i32; 3],
    pub y: [i32; 3],
    pub z: [i32; 3],
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            x: [1, 0, 0],
            y: [0, 1, 0],
            z: [0, 0, 1],
        }
    }
}

/// Distance units used by position-bearing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnits {
    Box,
    Lattice,
}

impl DistanceUnits {
    fn as_str(&self) -> &'static str {
        match self {
            DistanceUnits::Box => "box",
            DistanceUnits::Lattice => "lattice",
        }
    }
}

/// Axis-aligned block bounds, each axis as `(lo, hi)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub x: (Value, Value),
    pub y: (Value, Value),
    pub z: (Value, Value),
}

impl Block {
    fn values(&self) -> [&Value; 6] {
        [
            &self.x.0, &self.x.1, &self.y.0, &self.y.1, &self.z.0, &self.z.1,
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupSelector {
    Type(u32),
    Region(String),
    /// The first group minus all following ones.
    Subtract(Vec<String>),
    /// Atoms for which an atom-style variable is non-zero.
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariableFormula {
    Value(Value),
    /// An equal-style formula, rendered single-quoted.
    Expression(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComputeDef {
    ClusterAtom { cutoff: f64 },
    PropertyAtom(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FixStyle {
    Nve,
    DtReset {
        every: u32,
        tmin: Value,
        tmax: Value,
        xmax: f64,
    },
}

/// Kinds of named objects a session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Region,
    Group,
    Variable,
    Compute,
    Molecule,
    Fix,
    Dump,
}

impl DefinitionKind {
    /// Whether reissuing a definition under the same id is accepted by the engine.
    pub fn allows_redefinition(&self) -> bool {
        matches!(
            self,
            DefinitionKind::Group | DefinitionKind::Variable | DefinitionKind::Fix
        )
    }
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefinitionKind::Region => "region",
            DefinitionKind::Group => "group",
            DefinitionKind::Variable => "variable",
            DefinitionKind::Compute => "compute",
            DefinitionKind::Molecule => "molecule",
            DefinitionKind::Fix => "fix",
            DefinitionKind::Dump => "dump",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Log {
        path: PathBuf,
    },
    Package(Backend),
    Suffix(Backend),
    Units(UnitStyle),
    Dimension(u8),
    Boundary([BoundaryKind; 3]),
    AtomStyle(AtomStyle),
    AtomMap,
    ReadData {
        path: PathBuf,
    },
    Lattice {
        style: LatticeStyle,
        constant: f64,
        orientation: Orientation,
    },
    VariableDelete {
        name: String,
    },
    VariableEqual {
        name: String,
        formula: VariableFormula,
    },
    VariableAtom {
        name: String,
        formula: String,
    },
    Molecule {
        id: String,
        path: PathBuf,
    },
    CreateAtomsSingle {
        atom_type: u32,
        position: [Value; 3],
        molecule: String,
        seed: u32,
        units: DistanceUnits,
    },
    Region {
        id: String,
        block: Block,
        units: DistanceUnits,
    },
    PairStyle(String),
    PairCoeff {
        path: PathBuf,
        elements: Vec<String>,
    },
    Neighbor {
        skin: f64,
    },
    Group {
        id: String,
        selector: GroupSelector,
    },
    Compute {
        id: String,
        group: String,
        def: ComputeDef,
    },
    Fix {
        id: String,
        group: String,
        style: FixStyle,
    },
    Dump {
        id: String,
        group: String,
        every: u32,
        path: PathBuf,
        columns: Vec<String>,
    },
    WriteDump {
        group: String,
        path: PathBuf,
        columns: Vec<String>,
    },
    Velocity {
        group: String,
        components: [Value; 3],
        sum: bool,
        units: DistanceUnits,
    },
    Run {
        steps: u64,
    },
    Print {
        text: String,
    },
}

/// A name a command depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference<'a> {
    Defined(DefinitionKind, &'a str),
    Potential,
}

impl Command {
    /// The object this command brings into existence, if any.
    pub fn defines(&self) -> Option<(DefinitionKind, &str)> {
        match self {
            Command::VariableEqual { name, .. } | Command::VariableAtom { name, .. } => {
                Some((DefinitionKind::Variable, name.as_str()))
            }
            Command::Molecule { id, .. } => Some((DefinitionKind::Molecule, id.as_str())),
            Command::Region { id, .. } => Some((DefinitionKind::Region, id.as_str())),
            Command::Group { id, .. } => Some((DefinitionKind::Group, id.as_str())),
            Command::Compute { id, .. } => Some((DefinitionKind::Compute, id.as_str())),
            Command::Fix { id, .. } => Some((DefinitionKind::Fix, id.as_str())),
            Command::Dump { id, .. } => Some((DefinitionKind::Dump, id.as_str())),
            _ => None,
        }
    }

    /// Everything that must already exist on the engine side for this command to succeed.
    pub fn references(&self) -> Vec<Reference<'_>> {
        let mut refs = Vec::new();

        match self {
            Command::VariableEqual {
                formula: VariableFormula::Value(value),
                ..
            } => push_variables(std::iter::once(value), &mut refs),
            Command::CreateAtomsSingle {
                position, molecule, ..
            } => {
                push_variables(position, &mut refs);
                refs.push(Reference::Defined(DefinitionKind::Molecule, molecule));
            }
            Command::Region { block, .. } => push_variables(block.values(), &mut refs),
            Command::Group { selector, .. } => match selector {
                GroupSelector::Type(_) => {}
                GroupSelector::Region(region) => {
                    refs.push(Reference::Defined(DefinitionKind::Region, region))
                }
                GroupSelector::Subtract(groups) => refs.extend(
                    groups
                        .iter()
                        .map(|g| Reference::Defined(DefinitionKind::Group, g.as_str())),
                ),
                GroupSelector::Variable(var) => {
                    refs.push(Reference::Defined(DefinitionKind::Variable, var))
                }
            },
            Command::Compute { group, .. } => {
                refs.push(Reference::Defined(DefinitionKind::Group, group))
            }
            Command::Fix { group, style, .. } => {
                refs.push(Reference::Defined(DefinitionKind::Group, group));
                if let FixStyle::DtReset { tmin, tmax, .. } = style {
                    push_variables([tmin, tmax], &mut refs);
                }
            }
            Command::Dump { group, columns, .. } | Command::WriteDump { group, columns, .. } => {
                refs.push(Reference::Defined(DefinitionKind::Group, group));
                refs.extend(
                    columns
                        .iter()
                        .filter_map(|c| c.strip_prefix("c_"))
                        .map(|c| Reference::Defined(DefinitionKind::Compute, c)),
                );
            }
            Command::Velocity {
                group, components, ..
            } => {
                refs.push(Reference::Defined(DefinitionKind::Group, group));
                push_variables(components, &mut refs);
            }
            Command::PairCoeff { .. } | Command::Run { .. } => refs.push(Reference::Potential),
            _ => {}
        }
        refs
    }
}

fn push_variables<'a>(values: impl IntoIterator<Item = &'a Value>, refs: &mut Vec<Reference<'a>>) {
    refs.extend(
        values
            .into_iter()
            .filter_map(Value::referenced_variable)
            .map(|name| Reference::Defined(DefinitionKind::Variable, name)),
    );
}

/// Reals that happen to be integral keep a trailing `.0`.
fn real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

fn join(items: &[String]) -> String {
    items.join(" ")
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Log { path } => write!(f, "log {}", path.display()),
            Command::Package(backend) => match backend {
                Backend::Gpu => f.write_str("package gpu 0"),
                Backend::Omp { threads } => write!(f, "package omp {}", threads),
            },
            Command::Suffix(backend) => write!(f, "suffix {}", backend.suffix()),
            Command::Units(units) => write!(f, "units {}", units.as_str()),
            Command::Dimension(d) => write!(f, "dimension {}", d),
            Command::Boundary([x, y, z]) => {
                write!(f, "boundary {} {} {}", x.as_str(), y.as_str(), z.as_str())
            }
            Command::AtomStyle(style) => write!(f, "atom_style {}", style.as_str()),
            Command::AtomMap => f.write_str("atom_modify map yes"),
            Command::ReadData { path } => write!(f, "read_data {}", path.display()),
            Command::Lattice {
                style,
                constant,
                orientation,
            } => {
                let axis = |v: &[i32; 3]| format!("{} {} {}", v[0], v[1], v[2]);
                write!(
                    f,
                    "lattice {} {} orient x {} orient y {} orient z {}",
                    style.as_str(),
                    constant,
                    axis(&orientation.x),
                    axis(&orientation.y),
                    axis(&orientation.z)
                )
            }
            Command::VariableDelete { name } => write!(f, "variable {} delete", name),
            Command::VariableEqual { name, formula } => match formula {
                VariableFormula::Value(value) => write!(f, "variable {} equal {}", name, value),
                VariableFormula::Expression(expr) => {
                    write!(f, "variable {} equal '{}'", name, expr)
                }
            },
            Command::VariableAtom { name, formula } => {
                write!(f, "variable {} atom \"{}\"", name, formula)
            }
            Command::Molecule { id, path } => write!(f, "molecule {} \"{}\"", id, path.display()),
            Command::CreateAtomsSingle {
                atom_type,
                position: [x, y, z],
                molecule,
                seed,
                units,
            } => write!(
                f,
                "create_atoms {} single {} {} {} mol {} {} units {}",
                atom_type,
                x,
                y,
                z,
                molecule,
                seed,
                units.as_str()
            ),
            Command::Region { id, block, units } => {
                let [xlo, xhi, ylo, yhi, zlo, zhi] = block.values();
                write!(
                    f,
                    "region {} block {} {} {} {} {} {} units {}",
                    id,
                    xlo,
                    xhi,
                    ylo,
                    yhi,
                    zlo,
                    zhi,
                    units.as_str()
                )
            }
            Command::PairStyle(style) => write!(f, "pair_style {}", style),
            Command::PairCoeff { path, elements } => {
                write!(f, "pair_coeff * * {} {}", path.display(), join(elements))
            }
            Command::Neighbor { skin } => write!(f, "neighbor {} bin", real(*skin)),
            Command::Group { id, selector } => match selector {
                GroupSelector::Type(t) => write!(f, "group {} type {}", id, t),
                GroupSelector::Region(region) => write!(f, "group {} region {}", id, region),
                GroupSelector::Subtract(groups) => {
                    write!(f, "group {} subtract {}", id, join(groups))
                }
                GroupSelector::Variable(var) => write!(f, "group {} variable {}", id, var),
            },
            Command::Compute { id, group, def } => match def {
                ComputeDef::ClusterAtom { cutoff } => {
                    write!(f, "compute {} {} cluster/atom {}", id, group, cutoff)
                }
                ComputeDef::PropertyAtom(props) => {
                    write!(f, "compute {} {} property/atom {}", id, group, join(props))
                }
            },
            Command::Fix { id, group, style } => match style {
                FixStyle::Nve => write!(f, "fix {} {} nve", id, group),
                FixStyle::DtReset {
                    every,
                    tmin,
                    tmax,
                    xmax,
                } => write!(
                    f,
                    "fix {} {} dt/reset {} {} {} {}",
                    id, group, every, tmin, tmax, xmax
                ),
            },
            Command::Dump {
                id,
                group,
                every,
                path,
                columns,
            } => write!(
                f,
                "dump {} {} custom {} {} {}",
                id,
                group,
                every,
                path.display(),
                join(columns)
            ),
            Command::WriteDump {
                group,
                path,
                columns,
            } => write!(
                f,
                "write_dump {} custom {} {} modify sort id",
                group,
                path.display(),
                join(columns)
            ),
            Command::Velocity {
                group,
                components: [vx, vy, vz],
                sum,
                units,
            } => write!(
                f,
                "velocity {} set {} {} {} sum {} units {}",
                group,
                vx,
                vy,
                vz,
                if *sum { "yes" } else { "no" },
                units.as_str()
            ),
            Command::Run { steps } => write!(f, "run {}", steps),
            Command::Print { text } => write!(f, "print \"{}\"", text),
        }
    }
}
