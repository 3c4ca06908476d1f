use std::io;
use std::str::FromStr;

use boxsplice_netlist::{CellType, Const, Design, ParamValue, SigMap, Timing};
use boxsplice_yosys_json::{export, import};

fn roundtrip(design: &Design) -> Design {
    let mut buffer = Vec::<u8>::new();
    export(&mut buffer, design).unwrap();
    let mut cursor = io::Cursor::new(&buffer);
    import(&mut cursor).unwrap()
}

const SOURCE: &str = r#"
attribute \abc9_box_id 1
attribute \blackbox 1
module \adder
  attribute \abc9_carry 1
  wire input 1 \ci
  attribute \abc9_required "2 3"
  wire width 2 input 2 \a
  wire width 2 output 3 \s
  attribute \abc9_carry 1
  wire output 4 \co
end
module \top
  wire width 2 input 1 \a
  wire output 2 \y
  wire width 2 \s
  wire \n
  attribute \keep 1
  cell \adder \u0
    parameter \WIDTH 2
    connect \ci 1'0
    connect \a \a
    connect \s \s
    connect \co \n
  end
  cell $lut $l
    parameter \LUT 4'1000
    parameter \WIDTH 2
    connect \A \s
    connect \Y \y
  end
end
"#;

#[test]
fn test_roundtrip() {
    let design = Design::from_str(SOURCE).unwrap();
    let design2 = roundtrip(&design);

    let adder = design2.module("\\adder").unwrap();
    assert_eq!(adder.attrs.box_id, Some(1));
    assert!(adder.attrs.blackbox);
    let names = adder.ports.iter().map(|&id| adder.wire(id).name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["\\ci", "\\a", "\\s", "\\co"]);
    assert!(adder.wire_by_name("\\co").unwrap().attrs.carry);
    assert_eq!(adder.wire_by_name("\\a").unwrap().attrs.required, Some(Timing::List("2 3".into())));

    let top = design2.module("\\top").unwrap();
    let u0 = top.cell("\\u0").unwrap();
    assert_eq!(u0.type_, CellType::Instance("\\adder".into()));
    assert!(u0.attrs.keep);
    assert_eq!(u0.param("\\WIDTH").and_then(ParamValue::as_int), Some(2));
    let lut = top.cell("$l").unwrap();
    assert_eq!(lut.type_, CellType::Lut);
    assert_eq!(lut.lut_mask(), Some(Const::lit("1000")));

    let sigmap = SigMap::new(top);
    let s = top.sig(top.wire_id("\\s").unwrap());
    assert_eq!(sigmap.sig(u0.port("\\s").unwrap()), sigmap.sig(&s));
    assert_eq!(sigmap.sig(lut.port("\\A").unwrap()), sigmap.sig(&s));
    assert_eq!(sigmap.sig(u0.port("\\ci").unwrap()).as_const(), Some(Const::lit("0")));
}

#[test]
fn test_string_attribute_that_looks_like_bits() {
    let design = Design::from_str(
        r#"
attribute \src "0101"
module \m
end
"#,
    )
    .unwrap();
    let design2 = roundtrip(&design);
    let module = design2.module("\\m").unwrap();
    assert_eq!(module.attrs.other.get("\\src"), Some(&ParamValue::String("0101".into())));
}

#[test]
fn test_import_errors() {
    let mut cursor = io::Cursor::new(b"{\"modules\": {\"m\": {\"ports\": {\"a\": {\"direction\": \"sideways\", \"bits\": [2]}}}}}");
    assert!(import(&mut cursor).is_err());
    let mut cursor = io::Cursor::new(b"not json");
    assert!(import(&mut cursor).is_err());
}
