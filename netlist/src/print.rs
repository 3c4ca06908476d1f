use std::fmt::{Display, Formatter, Result};

use crate::{Attributes, Design, Module, ParamValue, SigBit, SigSpec};

pub(crate) fn write_string(f: &mut Formatter, string: &str) -> Result {
    write!(f, "\"")?;
    for chr in string.chars() {
        match chr {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            chr => write!(f, "{chr}")?,
        }
    }
    write!(f, "\"")
}

fn write_attrs(f: &mut Formatter, indent: &str, attrs: Vec<(String, ParamValue)>) -> Result {
    for (name, value) in attrs {
        writeln!(f, "{indent}attribute {name} {value}")?;
    }
    Ok(())
}

enum Chunk {
    Const(Vec<SigBit>),
    Wire { name: String, width: usize, offset: usize, len: usize },
}

fn chunks(module: &Module, sig: &SigSpec) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = vec![];
    for bit in sig.iter() {
        match (chunks.last_mut(), bit) {
            (Some(Chunk::Const(bits)), SigBit::Const(_)) => bits.push(bit),
            (Some(Chunk::Wire { name, offset, len, .. }), SigBit::Wire(wire, bit_offset))
                if *name == module.wire(wire).name && *offset + *len == bit_offset =>
            {
                *len += 1
            }
            (_, SigBit::Const(_)) => chunks.push(Chunk::Const(vec![bit])),
            (_, SigBit::Wire(wire, offset)) => {
                let wire = module.wire(wire);
                chunks.push(Chunk::Wire { name: wire.name.clone(), width: wire.width, offset, len: 1 })
            }
        }
    }
    chunks
}

fn write_chunk(f: &mut Formatter, chunk: &Chunk) -> Result {
    match chunk {
        Chunk::Const(bits) => {
            write!(f, "{}'", bits.len())?;
            for bit in bits.iter().rev() {
                if let SigBit::Const(state) = bit {
                    write!(f, "{state}")?;
                }
            }
            Ok(())
        }
        Chunk::Wire { name, width, offset, len } => {
            if *offset == 0 && len == width {
                write!(f, "{name}")
            } else if *len == 1 {
                write!(f, "{name} [{offset}]")
            } else {
                write!(f, "{name} [{}:{offset}]", offset + len - 1)
            }
        }
    }
}

pub(crate) fn write_sig(f: &mut Formatter, module: &Module, sig: &SigSpec) -> Result {
    let chunks = chunks(module, sig);
    match chunks.as_slice() {
        [chunk] => write_chunk(f, chunk),
        chunks => {
            write!(f, "{{")?;
            for chunk in chunks.iter().rev() {
                write!(f, " ")?;
                write_chunk(f, chunk)?;
            }
            write!(f, " }}")
        }
    }
}

struct Sig<'a>(&'a Module, &'a SigSpec);

impl Display for Sig<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_sig(f, self.0, self.1)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write_attrs(f, "", self.attrs.to_raw())?;
        writeln!(f, "module {}", self.name)?;
        for (name, value) in &self.parameters {
            writeln!(f, "  parameter {name} {value}")?;
        }
        let mut port_index = 0;
        let port_indices = self
            .ports
            .iter()
            .filter(|&&id| self.wire(id).is_port())
            .map(|&id| {
                port_index += 1;
                (id, port_index)
            })
            .collect::<Vec<_>>();
        for (id, wire) in self.wires() {
            write_attrs(f, "  ", wire.attrs.to_raw())?;
            write!(f, "  wire")?;
            if wire.width != 1 {
                write!(f, " width {}", wire.width)?;
            }
            if let Some(&(_, index)) = port_indices.iter().find(|(port, _)| *port == id) {
                let direction = match (wire.port_input, wire.port_output) {
                    (true, true) => "inout",
                    (true, false) => "input",
                    _ => "output",
                };
                write!(f, " {direction} {index}")?;
            }
            writeln!(f, " {}", wire.name)?;
        }
        for (name, cell) in self.cells() {
            write_attrs(f, "  ", cell.attrs.to_raw())?;
            writeln!(f, "  cell {} {name}", cell.type_.name())?;
            for (param, value) in &cell.parameters {
                writeln!(f, "    parameter {param} {value}")?;
            }
            for (port, sig) in &cell.connections {
                writeln!(f, "    connect {port} {}", Sig(self, sig))?;
            }
            writeln!(f, "  end")?;
        }
        for process in &self.processes {
            writeln!(f, "  process {process}")?;
            writeln!(f, "  end")?;
        }
        for (lhs, rhs) in &self.connections {
            writeln!(f, "  connect {} {}", Sig(self, lhs), Sig(self, rhs))?;
        }
        writeln!(f, "end")
    }
}

impl Display for Design {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for module in self.modules() {
            write!(f, "{module}")?;
        }
        Ok(())
    }
}
