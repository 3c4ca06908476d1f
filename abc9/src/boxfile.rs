use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use boxsplice_netlist::Module;

use crate::error::Error;
use crate::session::{Session, DELAY_BASE_ID};

/// Renders the box descriptor file for `module`: the contents of a prior box file (if any), the
/// descriptors of every register macro in use, and one record per delay placeholder value used
/// in the module. The delay values recorded on the module are consumed.
///
/// The mapper rejects an empty box file, so a dummy record is written if there would be nothing
/// else.
pub fn render_box_file(module: &mut Module, session: &Session, prior: Option<&str>) -> String {
    let mut output = String::new();
    if let Some(prior) = prior {
        output.push_str(prior);
        output.push('\n');
    }
    for flop_box in session.flop_boxes.values() {
        output.push_str(&flop_box.to_string());
    }
    if let Some(delays) = module.attrs.delays.take() {
        for delay in delays {
            let _ = writeln!(output, "$__DELAY@{delay} {} 0 1 1", DELAY_BASE_ID + delay);
            let _ = writeln!(output, "{delay}");
        }
    }
    if output.is_empty() {
        output.push_str("(dummy) 1 0 0 0");
    }
    output
}

/// Writes the box descriptor file for `module` to `dst`, starting with the contents of `src`.
pub fn write_box(module: &mut Module, session: &Session, src: Option<&Path>, dst: &Path) -> Result<(), Error> {
    let prior = src.map(std::fs::read_to_string).transpose()?;
    let contents = render_box_file(module, session, prior.as_deref());
    debug!("writing {} byte box file for {} to {}", contents.len(), module.name, dst.display());
    std::fs::write(dst, contents)?;
    Ok(())
}
