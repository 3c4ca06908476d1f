use std::collections::BTreeMap;
use std::fmt::Display;

use indexmap::IndexMap;

use boxsplice_netlist::{CellType, Module, SigBit};

use crate::catalog::BoxCatalog;
use crate::error::Error;

/// Box ids handed out to register macros that do not have one.
pub const FLOPS_BASE_ID: i64 = 8000;
/// Box id of the delay placeholder for a delay of 0; a delay of `d` uses `DELAY_BASE_ID + d`.
pub const DELAY_BASE_ID: i64 = 9000;

/// Box descriptor of a register macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlopBox {
    pub name: String,
    pub box_id: i64,
    /// Input bits, not counting the register feedback input.
    pub inputs: usize,
    pub outputs: usize,
    /// Required time of every input bit.
    pub required: Vec<i64>,
}

impl Display for FlopBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.name.strip_prefix('\\').unwrap_or(&self.name);
        writeln!(f, "{name} {} 1 {} {}", self.box_id, self.inputs + 1, self.outputs)?;
        for required in &self.required {
            write!(f, "{required} ")?;
        }
        // register feedback
        writeln!(f, "0")?;
        writeln!(f)
    }
}

/// Associations recorded while building a holes network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolesInfo {
    /// Flip-flop cell in the holes network to the input bit carrying its current output.
    pub feedback: BTreeMap<String, SigBit>,
}

impl HolesInfo {
    /// Name of the wire carrying the current output of the register macro instance `cell`.
    pub fn feedback_wire_name(cell: &str) -> String {
        format!("{cell}.abc9_ff.Q")
    }

    /// Rebuilds the associations of a holes network built in an earlier session. A flip-flop
    /// named `<instance>.<name>` belongs to the register macro instance with the longest such
    /// prefix that has a feedback wire.
    pub fn recover(holes: &Module) -> Result<HolesInfo, Error> {
        let mut info = HolesInfo::default();
        for (name, cell) in holes.cells() {
            if !matches!(cell.type_, CellType::Dff(_)) {
                continue;
            }
            let feedback = name
                .rmatch_indices('.')
                .find_map(|(index, _)| holes.wire_id(&Self::feedback_wire_name(&name[..index])))
                .ok_or_else(|| Error::MissingFeedback { module: holes.name.clone(), cell: name.to_owned() })?;
            info.feedback.insert(name.to_owned(), SigBit::Wire(feedback, 0));
        }
        Ok(info)
    }
}

/// State shared by the operations run over one design.
#[derive(Debug, Clone)]
pub struct Session {
    next_epoch: usize,
    pub catalog: BoxCatalog,
    /// Register macro descriptors for the box file, by derived module name.
    pub flop_boxes: IndexMap<String, FlopBox>,
    pub(crate) next_flop_id: i64,
    /// Side tables of the holes networks built so far, by holes module name.
    pub holes: BTreeMap<String, HolesInfo>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Session {
        Session {
            next_epoch: 1,
            catalog: BoxCatalog::new(),
            flop_boxes: IndexMap::new(),
            next_flop_id: FLOPS_BASE_ID,
            holes: BTreeMap::new(),
        }
    }

    pub(crate) fn next_epoch(&mut self) -> usize {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }
}

/// Name of the holes network built for `module`.
pub fn holes_name(module: &str) -> String {
    format!("{module}$holes")
}

/// Name under which the mapper returns its result for `module`.
pub fn mapped_name(module: &str) -> String {
    format!("{module}$abc9")
}
