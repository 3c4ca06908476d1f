//! Preparation of a netlist for an external technology mapper that treats boxes (opaque macro
//! cells with a known timing model) as black boxes, and reintegration of its result.
//!
//! Before mapping, a module is validated ([`check`]), its combinational loops are broken at
//! marked cells ([`mark_scc`]), required times on box inputs are turned into delay
//! placeholders ([`prep_delays`]), registers are assigned clock domains ([`prep_dff`]), and the
//! logic of its boxes is described to the mapper in a holes network ([`prep_xaiger`]) together
//! with a box descriptor file ([`write_box`]). After mapping, [`reintegrate`] splices the mapped
//! module back into the original one.
//!
//! State shared between these steps is kept in a [`Session`].

mod error;
mod catalog;
mod graph;
mod session;
mod check;
mod scc;
mod dff;
mod delays;
mod xaiger;
mod boxfile;
mod reintegrate;
pub mod lut;

use std::path::PathBuf;

use tracing::info;

use boxsplice_netlist::{Design, Module};

pub use error::{Error, CheckError};
pub use catalog::{BoxCatalog, is_box_type};
pub use graph::{DependencyGraph, find_loops};
pub use session::{Session, FlopBox, HolesInfo, holes_name, mapped_name, FLOPS_BASE_ID, DELAY_BASE_ID};
pub use check::check;
pub use scc::mark_scc;
pub use dff::prep_dff;
pub use delays::prep_delays;
pub use xaiger::prep_xaiger;
pub use boxfile::{render_box_file, write_box};
pub use reintegrate::reintegrate;

/// The operations to run over a design, in the order [`Abc9Ops::run`] runs them.
#[derive(Debug, Clone, Default)]
pub struct Abc9Ops {
    pub check: bool,
    pub prep_delays: bool,
    /// Box file to write for every module: the prior box file to include, if any, and the
    /// destination.
    pub write_box: Option<(Option<PathBuf>, PathBuf)>,
    pub mark_scc: bool,
    pub prep_dff: bool,
    pub prep_xaiger: bool,
    /// Treat register macros as boxes during extraction.
    pub dff: bool,
    pub reintegrate: bool,
    /// Modules to process; all design modules if empty.
    pub modules: Vec<String>,
}

fn selected_by_default(module: &Module) -> bool {
    !module.attrs.is_box_like() && !module.attrs.holes && !module.name.ends_with("$abc9")
}

impl Abc9Ops {
    fn selection(&self, design: &Design) -> Vec<String> {
        if self.modules.is_empty() {
            design.modules().filter(|module| selected_by_default(module)).map(|module| module.name.clone()).collect()
        } else {
            self.modules.iter().filter(|name| design.module(name).is_some()).cloned().collect()
        }
    }

    /// Runs the requested operations: validation and delay preparation over the whole
    /// selection first, then every other operation module by module.
    pub fn run(&self, design: &mut Design, session: &mut Session) -> Result<(), Error> {
        let any = self.check
            || self.prep_delays
            || self.write_box.is_some()
            || self.mark_scc
            || self.prep_dff
            || self.prep_xaiger
            || self.reintegrate;
        if !any {
            return Err(Error::NoOperation);
        }
        if self.dff && !self.prep_xaiger {
            return Err(Error::DffWithoutXaiger);
        }

        let modules = self.selection(design);
        if self.check {
            check(design)?;
        }
        if self.prep_delays {
            prep_delays(design, session, &modules)?;
        }
        for module_name in &modules {
            let Some(module) = design.module_mut(module_name) else { continue };
            if module.attrs.holes {
                continue;
            }
            if module.has_processes() {
                info!("Skipping module {} as it contains processes.", module_name);
                continue;
            }
            if let Some((src, dst)) = &self.write_box {
                write_box(module, session, src.as_deref(), dst)?;
            }
            if self.mark_scc {
                mark_scc(design, module_name);
            }
            if self.prep_dff {
                prep_dff(design, session, module_name)?;
            }
            if self.prep_xaiger {
                prep_xaiger(design, session, module_name, self.dff)?;
            }
            if self.reintegrate {
                reintegrate(design, session, module_name)?;
            }
        }
        Ok(())
    }
}
