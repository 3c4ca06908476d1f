use std::{error::Error, fs::File, io::Write, path::PathBuf};

use tracing_subscriber::{EnvFilter, prelude::*};
use tracing_tree::HierarchicalLayer;

use boxsplice_abc9::{Abc9Ops, Session};
use boxsplice_netlist::Design;

fn read_design(name: &str) -> Result<Design, Box<dyn Error>> {
    if name.ends_with(".il") {
        Ok(boxsplice_netlist::parse(&std::fs::read_to_string(name)?)?)
    } else if name.ends_with(".json") {
        Ok(boxsplice_yosys_json::import(&mut File::open(name)?)?)
    } else if name.is_empty() {
        Err("no input provided".into())
    } else {
        Err(format!("don't know what to do with input {name:?}").into())
    }
}

fn write_design(design: &Design, name: &str) -> Result<(), Box<dyn Error>> {
    if name.ends_with(".il") {
        write!(&mut File::create(name)?, "{design}")?;
    } else if name.ends_with(".json") {
        boxsplice_yosys_json::export(&mut File::create(name)?, design)?;
    } else if name.is_empty() {
        print!("{design}");
    } else {
        return Err(format!("don't know what to do with output {name:?}").into());
    }
    Ok(())
}

/// Moves every module of `other` into `design`, replacing modules of the same name.
fn merge(design: &mut Design, mut other: Design) -> Result<(), Box<dyn Error>> {
    for name in other.module_names() {
        if let Some(module) = other.remove_module(&name) {
            design.remove_module(&name);
            design.add_module(module)?;
        }
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut ops = Abc9Ops::default();
    let mut box_src = None::<String>;
    let mut box_dst = None::<String>;
    let mut mapped = None::<String>;
    let mut input = String::new();
    let mut output = String::new();
    {
        let mut parser = argparse::ArgumentParser::new();
        parser.set_description("Prepare a netlist for a box-aware technology mapper, and reintegrate its result.");
        parser.refer(&mut ops.check).add_option(&["--check"], argparse::StoreTrue, "Validate box types");
        parser.refer(&mut ops.mark_scc).add_option(&["--mark-scc"], argparse::StoreTrue, "Break marked loops");
        parser.refer(&mut ops.prep_delays).add_option(
            &["--prep-delays"],
            argparse::StoreTrue,
            "Insert delay placeholders for required times",
        );
        parser.refer(&mut ops.prep_xaiger).add_option(&["--prep-xaiger"], argparse::StoreTrue, "Build holes networks");
        parser.refer(&mut ops.dff).add_option(&["--dff"], argparse::StoreTrue, "Treat register macros as boxes");
        parser.refer(&mut ops.prep_dff).add_option(&["--prep-dff"], argparse::StoreTrue, "Prepare registers");
        parser.refer(&mut box_src).add_option(&["--box-src"], argparse::StoreOption, "Prior box file to include");
        parser.refer(&mut box_dst).add_option(&["--box-dst"], argparse::StoreOption, "Box file to write");
        parser.refer(&mut ops.reintegrate).add_option(&["--reintegrate"], argparse::StoreTrue, "Splice in mapped logic");
        parser.refer(&mut mapped).add_option(&["--mapped"], argparse::StoreOption, "Mapper output to merge in");
        parser.refer(&mut ops.modules).add_option(&["-m", "--module"], argparse::Collect, "Module to process");
        parser.refer(&mut input).add_argument("INPUT", argparse::Store, "Input file");
        parser.refer(&mut output).add_argument("OUTPUT", argparse::Store, "Output file");
        parser.parse_args_or_exit();
    }

    match (box_src, box_dst) {
        (src, Some(dst)) => ops.write_box = Some((src.map(PathBuf::from), PathBuf::from(dst))),
        (Some(_), None) => return Err("--box-src requires --box-dst".into()),
        (None, None) => (),
    }

    let mut design = read_design(&input)?;
    if let Some(mapped) = mapped {
        merge(&mut design, read_design(&mapped)?)?;
    }
    let mut session = Session::new();
    ops.run(&mut design, &mut session)?;
    write_design(&design, &output)
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(HierarchicalLayer::new(2).with_writer(std::io::stderr))
        .init();
    if let Err(error) = run() {
        eprintln!("error: {}", error);
        std::process::exit(1)
    }
}
