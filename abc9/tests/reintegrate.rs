mod common;

use std::collections::BTreeMap;
use std::str::FromStr;

use boxsplice_abc9::{
    check, holes_name, mapped_name, prep_delays, prep_xaiger, reintegrate, Abc9Ops, Error, Session,
};
use boxsplice_netlist::{id, Cell, CellType, Const, Design, Module, SigBit, SigMap, Wire};

fn port_widths(design: &Design, cell: &str) -> BTreeMap<String, usize> {
    let cell = design.module("\\top").unwrap().cell(cell).unwrap();
    cell.connections.iter().map(|(port, sig)| (port.clone(), sig.len())).collect()
}

#[test]
fn test_single_lut() {
    let mut design = Design::from_str(concat!(
        "module \\top\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire input 4 \\d\n",
        "  wire output 5 \\y\n",
        "  cell $lut \\l\n",
        "    parameter \\WIDTH 4\n",
        "    parameter \\LUT 16'0110100110010110\n",
        "    connect \\A { \\d \\c \\b \\a }\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "end\n",
        "module \\top$abc9\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire input 4 \\d\n",
        "  wire output 5 \\y\n",
        "  cell $lut \\l\n",
        "    parameter \\WIDTH 4\n",
        "    parameter \\LUT 16'0110100110010110\n",
        "    connect \\A { \\d \\c \\b \\a }\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    let mut session = Session::new();
    check(&design).unwrap();
    prep_xaiger(&mut design, &mut session, "\\top", false).unwrap();
    assert!(design.module(&holes_name("\\top")).is_none());

    reintegrate(&mut design, &mut session, "\\top").unwrap();
    assert!(design.module(&mapped_name("\\top")).is_none());
    let module = design.module("\\top").unwrap();
    assert_eq!(module.cell_names(), vec!["$abc$1$l".to_owned()]);
    assert_eq!(module.cell("$abc$1$l").unwrap().type_, CellType::Lut);
    for inputs in common::assignments(&["\\a", "\\b", "\\c", "\\d"]) {
        let parity = inputs.values().filter(|bits| bits[0]).count() % 2 == 1;
        assert_eq!(common::simulate(module, &inputs)["\\y"], vec![Some(parity)]);
    }
}

#[test]
fn test_inverter_absorbed() {
    let mut design = Design::from_str(concat!(
        "module \\top\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire input 4 \\d\n",
        "  wire output 5 \\y2\n",
        "  wire output 6 \\y3\n",
        "  wire output 7 \\y4\n",
        "  wire \\n\n",
        "  wire \\m\n",
        "  cell $_AND_ \\g1\n",
        "    connect \\A \\a\n",
        "    connect \\B \\b\n",
        "    connect \\Y \\n\n",
        "  end\n",
        "  cell $_NOT_ \\g2\n",
        "    connect \\A \\n\n",
        "    connect \\Y \\m\n",
        "  end\n",
        "  cell $_XOR_ \\g3\n",
        "    connect \\A \\m\n",
        "    connect \\B \\c\n",
        "    connect \\Y \\y2\n",
        "  end\n",
        "  cell $_AND_ \\g4\n",
        "    connect \\A \\m\n",
        "    connect \\B \\d\n",
        "    connect \\Y \\y3\n",
        "  end\n",
        "  cell $_OR_ \\g5\n",
        "    connect \\A \\n\n",
        "    connect \\B \\d\n",
        "    connect \\Y \\y4\n",
        "  end\n",
        "end\n",
        "module \\top$abc9\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire input 4 \\d\n",
        "  wire output 5 \\y2\n",
        "  wire output 6 \\y3\n",
        "  wire output 7 \\y4\n",
        "  wire \\n\n",
        "  wire \\m\n",
        "  cell $lut \\n\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'1000\n",
        "    connect \\A { \\b \\a }\n",
        "    connect \\Y \\n\n",
        "  end\n",
        "  cell $_NOT_ $not$1\n",
        "    connect \\A \\n\n",
        "    connect \\Y \\m\n",
        "  end\n",
        "  cell $lut \\y2\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'0110\n",
        "    connect \\A { \\c \\m }\n",
        "    connect \\Y \\y2\n",
        "  end\n",
        "  cell $lut \\y3\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'1000\n",
        "    connect \\A { \\d \\m }\n",
        "    connect \\Y \\y3\n",
        "  end\n",
        "  cell $lut \\y4\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'1110\n",
        "    connect \\A { \\d \\n }\n",
        "    connect \\Y \\y4\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    let gold = design.module("\\top").unwrap().clone();
    let mut session = Session::new();
    reintegrate(&mut design, &mut session, "\\top").unwrap();

    let module = design.module("\\top").unwrap();
    assert!(module.cells().all(|(_, cell)| cell.type_ == CellType::Lut));
    assert_eq!(module.cell_count(), 5);
    for inputs in common::assignments(&["\\a", "\\b", "\\c", "\\d"]) {
        assert_eq!(common::simulate(module, &inputs), common::simulate(&gold, &inputs));
    }
}

#[test]
fn test_inverter_of_input() {
    let mut design = Design::from_str(concat!(
        "module \\top\n",
        "  wire input 1 \\a\n",
        "  wire output 2 \\y\n",
        "  wire output 3 \\z\n",
        "end\n",
        "module \\top$abc9\n",
        "  wire input 1 \\a\n",
        "  wire output 2 \\y\n",
        "  wire output 3 \\z\n",
        "  cell $_NOT_ $not$1\n",
        "    connect \\A \\a\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "  cell $_NOT_ $not$2\n",
        "    connect \\A 1'0\n",
        "    connect \\Y \\z\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    reintegrate(&mut design, &mut Session::new(), "\\top").unwrap();
    let module = design.module("\\top").unwrap();
    assert_eq!(module.cell_names(), vec!["$abc$1$lut$not$1".to_owned()]);
    for inputs in common::assignments(&["\\a"]) {
        let outputs = common::simulate(module, &inputs);
        assert_eq!(outputs["\\y"], vec![Some(!inputs["\\a"][0])]);
        assert_eq!(outputs["\\z"], vec![Some(true)]);
    }
}

const ADDER: &str = concat!(
    "attribute \\abc9_box_id 1\n",
    "attribute \\whitebox 1\n",
    "module \\ADD\n",
    "  attribute \\abc9_carry 1\n",
    "  wire input 1 \\ci\n",
    "  wire width 2 input 2 \\a\n",
    "  wire width 2 output 3 \\s\n",
    "  attribute \\abc9_carry 1\n",
    "  wire output 4 \\co\n",
    "  cell $_XOR_ \\x\n",
    "    connect \\A \\a [0]\n",
    "    connect \\B \\ci\n",
    "    connect \\Y \\s [0]\n",
    "  end\n",
    "  connect \\s [1] \\a [1]\n",
    "  connect \\co \\ci\n",
    "end\n",
    "module \\top\n",
    "  wire width 2 input 1 \\a\n",
    "  wire input 2 \\ci\n",
    "  wire width 2 output 3 \\s\n",
    "  wire output 4 \\co\n",
    "  cell \\ADD \\u\n",
    "    connect \\ci \\ci\n",
    "    connect \\a \\a\n",
    "    connect \\s \\s\n",
    "    connect \\co \\co\n",
    "  end\n",
    "end\n",
    "module \\top$abc9\n",
    "  wire width 2 input 1 \\a\n",
    "  wire input 2 \\ci\n",
    "  wire width 2 output 3 \\s\n",
    "  wire output 4 \\co\n",
    "  cell $__boxid1 \\u\n",
    "    connect \\i { \\ci \\a }\n",
    "    connect \\o { \\co \\s }\n",
    "  end\n",
    "end\n",
);

#[test]
fn test_box_ports_restored() {
    let mut design = Design::from_str(ADDER).unwrap();
    let widths = port_widths(&design, "\\u");
    let mut session = Session::new();
    check(&design).unwrap();
    prep_xaiger(&mut design, &mut session, "\\top", false).unwrap();
    assert!(session.holes.contains_key(&holes_name("\\top")));

    reintegrate(&mut design, &mut session, "\\top").unwrap();
    assert!(design.module(&holes_name("\\top")).is_none());
    assert!(session.holes.is_empty());
    assert_eq!(port_widths(&design, "\\u"), widths);

    let module = design.module("\\top").unwrap();
    assert_eq!(module.cell_names(), vec!["\\u".to_owned()]);
    let cell = module.cell("\\u").unwrap();
    assert_eq!(cell.type_, CellType::Instance("\\ADD".into()));
    assert_eq!(cell.attrs.box_seq, None);
    let sigmap = SigMap::new(module);
    for port in ["\\a", "\\ci", "\\s", "\\co"] {
        let wire = module.wire_id(port).unwrap();
        assert_eq!(sigmap.sig(cell.port(port).unwrap()), sigmap.sig(&module.sig(wire)), "port {port}");
    }
}

#[test]
fn test_box_id_mismatch() {
    let mut design = Design::from_str(&ADDER.replace("$__boxid1", "$__boxid2")).unwrap();
    let before = design.to_string();
    let error = reintegrate(&mut design, &mut Session::new(), "\\top").unwrap_err();
    assert!(matches!(&error, Error::BoxIdMismatch { expected, found, .. }
        if expected == "$__boxid1" && found == "$__boxid2"));
    assert!(error.is_internal());
    assert_eq!(design.to_string(), before);
}

#[test]
fn test_box_bus_width_mismatch() {
    for (from, to, port, width, mapped) in [
        ("\\i { \\ci \\a }", "\\i \\a", "\\i", 3, 2),
        ("\\o { \\co \\s }", "\\o { \\co \\co \\s }", "\\o", 3, 4),
    ] {
        let mut design = Design::from_str(&ADDER.replace(from, to)).unwrap();
        let before = design.to_string();
        let error = reintegrate(&mut design, &mut Session::new(), "\\top").unwrap_err();
        assert!(
            matches!(&error, Error::BoxWidthMismatch { cell, port: found, width: w, mapped: m, .. }
                if cell == "\\u" && found == port && *w == width && *m == mapped),
            "{error}"
        );
        assert!(error.is_internal());
        assert_eq!(design.to_string(), before);
    }
}

#[test]
fn test_unknown_box() {
    let mut design = Design::from_str(&ADDER.replace("$__boxid1 \\u", "$__boxid1 \\v")).unwrap();
    let before = design.to_string();
    let error = reintegrate(&mut design, &mut Session::new(), "\\top").unwrap_err();
    assert_eq!(error.to_string(), "Cannot find existing box cell with name 'v' in original design 'top'.");
    assert_eq!(design.to_string(), before);
}

#[test]
fn test_missing_mapped_module() {
    let mut design = Design::from_str("module \\top\nend\n").unwrap();
    let error = reintegrate(&mut design, &mut Session::new(), "\\top").unwrap_err();
    assert!(matches!(error, Error::MissingMappedModule { .. }));
    assert!(error.is_internal());
    assert_eq!(error.to_string(), "ABC output file does not contain a module `top$abc9'.");
}

#[test]
fn test_delay_becomes_connection() {
    let mut design = Design::from_str(concat!(
        "attribute \\blackbox 1\n",
        "module \\RAM\n",
        "  attribute \\abc9_required 5\n",
        "  wire input 1 \\A\n",
        "  wire output 2 \\D\n",
        "end\n",
        "module \\top\n",
        "  wire input 1 \\x\n",
        "  wire output 2 \\q\n",
        "  cell \\RAM \\m\n",
        "    connect \\A \\x\n",
        "    connect \\D \\q\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    let mut session = Session::new();
    let ops = Abc9Ops { check: true, prep_delays: true, prep_xaiger: true, ..Abc9Ops::default() };
    ops.run(&mut design, &mut session).unwrap();

    let module = design.module("\\top").unwrap();
    let (delay_name, delay) = module.cells().find(|(_, cell)| cell.type_ == CellType::Delay).unwrap();
    assert_eq!(delay.attrs.box_seq, Some(0));
    let SigBit::Wire(delayed, _) = delay.port_bit(id::O).unwrap() else { panic!("delay output is constant") };
    let delayed_name = module.wire(delayed).name.clone();
    let delay_name = delay_name.to_owned();

    let mut mapped = Module::new(mapped_name("\\top"));
    let x = mapped.add_wire(Wire { port_input: true, ..Wire::new("\\x", 1) }).unwrap();
    let o = mapped.add_wire(Wire { port_output: true, ..Wire::new(delayed_name, 1) }).unwrap();
    mapped.ports.extend([x, o]);
    let placeholder = Cell::new(CellType::Instance("$__boxid9005".into()))
        .with_port(id::BOX_I, SigBit::Wire(x, 0))
        .with_port(id::BOX_O, SigBit::Wire(o, 0));
    mapped.add_cell(delay_name, placeholder).unwrap();
    design.add_module(mapped).unwrap();

    let ops = Abc9Ops { reintegrate: true, modules: vec!["\\top".into()], ..Abc9Ops::default() };
    ops.run(&mut design, &mut session).unwrap();
    let module = design.module("\\top").unwrap();
    assert!(module.cells().all(|(_, cell)| cell.type_ != CellType::Delay));
    let sigmap = SigMap::new(module);
    let ram = module.cell("\\m").unwrap();
    let x = module.wire_id("\\x").unwrap();
    assert_eq!(sigmap.sig(ram.port("\\A").unwrap()), sigmap.sig(&module.sig(x)));
}

#[test]
fn test_operation_requests() {
    let mut design = Design::from_str("module \\top\nend\n").unwrap();
    let mut session = Session::new();
    assert!(matches!(Abc9Ops::default().run(&mut design, &mut session), Err(Error::NoOperation)));
    let ops = Abc9Ops { check: true, dff: true, ..Abc9Ops::default() };
    assert!(matches!(ops.run(&mut design, &mut session), Err(Error::DffWithoutXaiger)));
}

#[test]
fn test_lut_mask_size_overflow() {
    let mut design = Design::from_str(concat!(
        "module \\top\n",
        "  wire width 64 input 1 \\a\n",
        "  wire output 2 \\y\n",
        "end\n",
        "module \\top$abc9\n",
        "  wire width 64 input 1 \\a\n",
        "  wire output 2 \\y\n",
        "  cell $lut \\l\n",
        "    parameter \\WIDTH 64\n",
        "    parameter \\LUT 2'01\n",
        "    connect \\A \\a\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    let before = design.to_string();
    let error = reintegrate(&mut design, &mut Session::new(), "\\top").unwrap_err();
    assert!(matches!(&error, Error::MalformedCell { cell, port, .. } if cell == "\\l" && port == id::LUT));
    assert_eq!(design.to_string(), before);
}

const REGISTER_BOX: &str = concat!(
    "attribute \\abc9_flop 1\n",
    "attribute \\blackbox 1\n",
    "module \\FD\n",
    "  wire input 1 \\C\n",
    "  wire input 2 \\D\n",
    "  wire output 3 \\Q\n",
    "end\n",
    "module \\top\n",
    "  wire input 1 \\clk\n",
    "  wire input 2 \\d\n",
    "  wire output 3 \\q\n",
    "  cell \\FD \\r\n",
    "    connect \\C \\clk\n",
    "    connect \\D \\d\n",
    "    connect \\Q \\q\n",
    "  end\n",
    "end\n",
);

/// The mapper's view of `REGISTER_BOX`, with the box input bus `inputs`.
fn register_mapped(inputs: &str) -> Module {
    let text = format!(
        concat!(
            "module \\top$abc9\n",
            "  wire input 1 \\clk\n",
            "  wire input 2 \\d\n",
            "  wire output 3 \\q\n",
            "  cell $__boxid8000 \\r\n",
            "    connect \\i {}\n",
            "    connect \\o \\q\n",
            "  end\n",
            "end\n",
        ),
        inputs
    );
    Design::from_str(&text).unwrap().remove_module(&mapped_name("\\top")).unwrap()
}

#[test]
fn test_register_macro_restored() {
    let mut design = Design::from_str(REGISTER_BOX).unwrap();
    let mut session = Session::new();
    check(&design).unwrap();
    prep_delays(&mut design, &mut session, &["\\top".to_owned()]).unwrap();
    prep_xaiger(&mut design, &mut session, "\\top", true).unwrap();
    assert_eq!(design.module("\\FD").unwrap().attrs.box_id, Some(8000));
    assert_eq!(design.module("\\top").unwrap().cell("\\r").unwrap().attrs.box_seq, Some(0));

    let mut without_feedback = design.clone();
    without_feedback.add_module(register_mapped("{ \\d \\clk }")).unwrap();
    let before = without_feedback.to_string();
    let error = reintegrate(&mut without_feedback, &mut session.clone(), "\\top").unwrap_err();
    assert!(matches!(error, Error::BoxWidthMismatch { width: 3, mapped: 2, .. }), "{error}");
    assert_eq!(without_feedback.to_string(), before);

    design.add_module(register_mapped("{ \\q \\d \\clk }")).unwrap();
    reintegrate(&mut design, &mut session, "\\top").unwrap();
    assert!(design.module(&holes_name("\\top")).is_none());
    assert!(design.module(&mapped_name("\\top")).is_none());

    let module = design.module("\\top").unwrap();
    assert_eq!(module.cell_names(), vec!["\\r".to_owned()]);
    let cell = module.cell("\\r").unwrap();
    assert_eq!(cell.type_, CellType::Instance("\\FD".into()));
    assert_eq!(cell.attrs.box_seq, None);
    let widths = BTreeMap::from([("\\C".to_owned(), 1), ("\\D".to_owned(), 1), ("\\Q".to_owned(), 1)]);
    assert_eq!(port_widths(&design, "\\r"), widths);
    let sigmap = SigMap::new(module);
    for (port, wire) in [("\\C", "\\clk"), ("\\D", "\\d"), ("\\Q", "\\q")] {
        let wire = module.wire_id(wire).unwrap();
        assert_eq!(sigmap.sig(cell.port(port).unwrap()), sigmap.sig(&module.sig(wire)), "port {port}");
    }
}

#[test]
fn test_inverter_with_box_reader() {
    let mut design = Design::from_str(concat!(
        "attribute \\abc9_box_id 2\n",
        "attribute \\blackbox 1\n",
        "module \\BB\n",
        "  wire input 1 \\x\n",
        "  wire output 2 \\z\n",
        "end\n",
        "module \\top\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire output 4 \\y\n",
        "  wire output 5 \\w\n",
        "  wire \\n\n",
        "  wire \\m\n",
        "  cell $_AND_ \\g1\n",
        "    connect \\A \\a\n",
        "    connect \\B \\b\n",
        "    connect \\Y \\n\n",
        "  end\n",
        "  cell $_NOT_ \\g2\n",
        "    connect \\A \\n\n",
        "    connect \\Y \\m\n",
        "  end\n",
        "  cell $_XOR_ \\g3\n",
        "    connect \\A \\m\n",
        "    connect \\B \\c\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "  cell \\BB \\u\n",
        "    connect \\x \\n\n",
        "    connect \\z \\w\n",
        "  end\n",
        "end\n",
        "module \\top$abc9\n",
        "  wire input 1 \\a\n",
        "  wire input 2 \\b\n",
        "  wire input 3 \\c\n",
        "  wire output 4 \\y\n",
        "  wire output 5 \\w\n",
        "  wire \\n\n",
        "  wire \\m\n",
        "  cell $lut \\n\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'1000\n",
        "    connect \\A { \\b \\a }\n",
        "    connect \\Y \\n\n",
        "  end\n",
        "  cell $_NOT_ $not$1\n",
        "    connect \\A \\n\n",
        "    connect \\Y \\m\n",
        "  end\n",
        "  cell $lut \\y\n",
        "    parameter \\WIDTH 2\n",
        "    parameter \\LUT 4'0110\n",
        "    connect \\A { \\c \\m }\n",
        "    connect \\Y \\y\n",
        "  end\n",
        "  cell $__boxid2 \\u\n",
        "    connect \\i \\n\n",
        "    connect \\o \\w\n",
        "  end\n",
        "end\n",
    ))
    .unwrap();
    let gold = design.module("\\top").unwrap().clone();
    let mut session = Session::new();
    check(&design).unwrap();
    prep_xaiger(&mut design, &mut session, "\\top", false).unwrap();
    reintegrate(&mut design, &mut session, "\\top").unwrap();

    let module = design.module("\\top").unwrap();
    assert!(module.cells().all(|(_, cell)| cell.type_ != CellType::Not));
    assert_eq!(module.cell_count(), 4);
    let sigmap = SigMap::new(module);
    let driver = module.cell("$abc$1$n").unwrap();
    let box_cell = module.cell("\\u").unwrap();
    assert_eq!(sigmap.sig(box_cell.port("\\x").unwrap()), sigmap.sig(driver.port(id::Y).unwrap()));
    assert_eq!(driver.lut_mask(), Some(Const::lit("1000")));

    let (_, copy) = module
        .cells()
        .find(|(name, cell)| cell.type_ == CellType::Lut && !name.starts_with("$abc$"))
        .unwrap();
    assert_eq!(copy.port(id::A), driver.port(id::A));
    assert_eq!(copy.lut_mask(), Some(Const::lit("0111")));
    for inputs in common::assignments(&["\\a", "\\b", "\\c"]) {
        assert_eq!(common::simulate(module, &inputs), common::simulate(&gold, &inputs));
    }
}
