use std::{fmt::Display, str::FromStr};

use yap::{one_of, types::WithContext, IntoTokens, TokenLocation, Tokens};

use crate::{
    Attributes, Cell, CellAttrs, CellType, Const, Design, Module, ModuleAttrs, ParamValue, SigBit, SigSpec, State,
    Wire, WireAttrs, WireId,
};

#[derive(Debug, Default)]
struct Context {
    design: Design,
    attrs: Vec<(String, ParamValue)>,
    module: Option<Module>,
    port_ids: Vec<(usize, WireId)>,
    cell: Option<(String, Cell)>,
    process_depth: usize,
}

impl Context {
    fn take_attrs<A: Attributes>(&mut self) -> A {
        A::from_raw(std::mem::take(&mut self.attrs))
    }
}

fn parse_space(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> bool {
    t.skip_while(|c| *c == ' ' || *c == '\t') > 0
}

fn parse_comment(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> bool {
    if !t.token('#') {
        return false;
    }
    t.skip_while(|c| *c != '\n');
    true
}

fn parse_blank(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> bool {
    let space = parse_space(t);
    let comment = parse_comment(t);
    space || comment
}

#[must_use]
fn parse_symbol(t: &mut WithContext<impl Tokens<Item = char>, Context>, symbol: char) -> Option<()> {
    if !t.token(symbol) {
        return None;
    }
    Some(())
}

#[must_use]
fn parse_eol(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_blank(t);
    if t.token('\n') || t.eof() { Some(()) } else { None }
}

fn parse_decimal<T: FromStr>(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<T> {
    t.take_while(|c| c.is_ascii_digit() || *c == '-').parse::<T, String>().ok()
}

fn parse_keyword(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<String> {
    let name: String = t.take_while(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

#[must_use]
fn parse_keyword_expect(t: &mut WithContext<impl Tokens<Item = char>, Context>, expected: &str) -> Option<()> {
    let keyword = parse_keyword(t)?;
    if keyword != expected {
        return None;
    }
    parse_blank(t);
    Some(())
}

/// Public (`\name`) or internal (`$name`) identifier.
fn parse_id(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<String> {
    if !matches!(t.peek(), Some('\\' | '$')) {
        return None;
    }
    let name: String = t.take_while(|c| !c.is_whitespace()).collect();
    if name.len() < 2 {
        return None;
    }
    Some(name)
}

fn parse_string(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<String> {
    parse_symbol(t, '"')?;
    let mut string = String::new();
    loop {
        match t.next()? {
            '"' => return Some(string),
            '\\' => match t.next()? {
                'n' => string.push('\n'),
                't' => string.push('\t'),
                chr => string.push(chr),
            },
            chr => string.push(chr),
        }
    }
}

/// Sized constant such as `4'01x0`; shorter bit strings are zero-extended.
fn parse_constant(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<Const> {
    let width: usize = parse_decimal(t)?;
    parse_symbol(t, '\'')?;
    let bits: String = t.take_while(|c| matches!(c, '0' | '1' | 'x' | 'z' | 'X' | 'Z' | '-')).collect();
    let mut value = bits.parse::<Const>().ok()?;
    if value.len() > width {
        return None;
    }
    while value.len() < width {
        value.push(State::Zero);
    }
    Some(value)
}

fn parse_value(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<ParamValue> {
    one_of!(t;
        parse_string(t).map(ParamValue::String),
        parse_constant(t).map(ParamValue::Const),
        parse_decimal::<i64>(t).map(ParamValue::Int),
    )
}

fn parse_wire_ref(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<SigSpec> {
    let name = parse_id(t)?;
    let range = t.optional(|t| {
        parse_blank(t);
        parse_symbol(t, '[')?;
        let hi: usize = parse_decimal(t)?;
        let lo = t
            .optional(|t| {
                parse_symbol(t, ':')?;
                parse_decimal::<usize>(t)
            })
            .unwrap_or(hi);
        parse_symbol(t, ']')?;
        Some((hi, lo))
    });
    let module = t.context().module.as_ref()?;
    let wire = module.wire_id(&name)?;
    let width = module.wire(wire).width;
    match range {
        None => Some(SigSpec::from_wire(wire, width)),
        Some((hi, lo)) if lo <= hi && hi < width => Some((lo..=hi).map(|offset| SigBit::Wire(wire, offset)).collect()),
        Some(_) => None,
    }
}

fn parse_concat(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<SigSpec> {
    parse_symbol(t, '{')?;
    let parts = t
        .many(|t| {
            parse_blank(t);
            parse_sigspec(t)
        })
        .collect::<Vec<_>>();
    parse_blank(t);
    parse_symbol(t, '}')?;
    let mut sig = SigSpec::new();
    for part in parts.iter().rev() {
        sig.append(part);
    }
    Some(sig)
}

fn parse_sigspec(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<SigSpec> {
    one_of!(t;
        parse_concat(t),
        parse_constant(t).map(SigSpec::from),
        parse_decimal::<i64>(t).map(|value| SigSpec::from(Const::from_int(value, 32))),
        parse_wire_ref(t),
    )
}

fn parse_process_body(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    if t.context().process_depth == 0 {
        return None;
    }
    let keyword: String = t.take_while(|c| !c.is_whitespace()).collect();
    t.skip_while(|c| *c != '\n');
    if !t.token('\n') && keyword.is_empty() {
        return None;
    }
    let ctx = t.context_mut();
    match keyword.as_str() {
        "switch" => ctx.process_depth += 1,
        "end" => ctx.process_depth -= 1,
        _ => (),
    }
    Some(())
}

fn parse_attribute(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "attribute")?;
    let name = parse_id(t)?;
    parse_blank(t);
    let value = parse_value(t)?;
    parse_eol(t)?;
    t.context_mut().attrs.push((name, value));
    Some(())
}

fn parse_autoidx(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "autoidx")?;
    parse_decimal::<u64>(t)?;
    parse_eol(t)
}

fn parse_module(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "module")?;
    let name = parse_id(t)?;
    parse_eol(t)?;
    let ctx = t.context_mut();
    if ctx.module.is_some() || ctx.design.module(&name).is_some() {
        return None;
    }
    let mut module = Module::new(name);
    module.attrs = ctx.take_attrs::<ModuleAttrs>();
    ctx.module = Some(module);
    ctx.port_ids.clear();
    Some(())
}

fn parse_parameter(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "parameter")?;
    t.many(|t| {
        one_of!(t;
            parse_keyword_expect(t, "signed"),
            parse_keyword_expect(t, "real"),
        )
    })
    .collect::<Vec<_>>();
    let name = parse_id(t)?;
    parse_blank(t);
    let value = t.optional(|t| parse_value(t));
    parse_eol(t)?;
    let ctx = t.context_mut();
    let value = value.unwrap_or(ParamValue::Const(Const::new()));
    match (&mut ctx.cell, &mut ctx.module) {
        (Some((_, cell)), _) => {
            cell.parameters.insert(name, value);
        }
        (None, Some(module)) => {
            module.parameters.insert(name, value);
        }
        (None, None) => return None,
    }
    Some(())
}

enum WireOption {
    Width(usize),
    Input(usize),
    Output(usize),
    Inout(usize),
    Ignored,
}

fn parse_wire_option(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<WireOption> {
    let keyword = parse_keyword(t)?;
    let option: fn(usize) -> WireOption = match keyword.as_str() {
        "upto" | "signed" => return Some(WireOption::Ignored),
        "width" => WireOption::Width,
        "input" => WireOption::Input,
        "output" => WireOption::Output,
        "inout" => WireOption::Inout,
        "offset" => |_| WireOption::Ignored,
        _ => return None,
    };
    parse_blank(t);
    Some(option(parse_decimal(t)?))
}

fn parse_wire(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "wire")?;
    let options = t
        .many(|t| {
            let option = parse_wire_option(t)?;
            parse_blank(t);
            Some(option)
        })
        .collect::<Vec<_>>();
    let name = parse_id(t)?;
    parse_eol(t)?;
    let ctx = t.context_mut();
    if ctx.cell.is_some() {
        return None;
    }
    let attrs = ctx.take_attrs::<WireAttrs>();
    let module = ctx.module.as_mut()?;
    let mut wire = Wire::new(name, 1);
    wire.attrs = attrs;
    let mut port_index = None;
    for option in options {
        match option {
            WireOption::Width(width) => wire.width = width,
            WireOption::Input(index) => {
                wire.port_input = true;
                port_index = Some(index);
            }
            WireOption::Output(index) => {
                wire.port_output = true;
                port_index = Some(index);
            }
            WireOption::Inout(index) => {
                wire.port_input = true;
                wire.port_output = true;
                port_index = Some(index);
            }
            WireOption::Ignored => (),
        }
    }
    let id = module.add_wire(wire).ok()?;
    if let Some(index) = port_index {
        ctx.port_ids.push((index, id));
    }
    Some(())
}

fn parse_cell(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "cell")?;
    let type_ = parse_id(t)?;
    parse_blank(t);
    let name = parse_id(t)?;
    parse_eol(t)?;
    let ctx = t.context_mut();
    if ctx.cell.is_some() || ctx.module.as_ref()?.cell(&name).is_some() {
        return None;
    }
    let mut cell = Cell::new(CellType::from_name(&type_));
    cell.attrs = ctx.take_attrs::<CellAttrs>();
    ctx.cell = Some((name, cell));
    Some(())
}

fn parse_connect(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "connect")?;
    if t.context().cell.is_some() {
        let port = parse_id(t)?;
        parse_blank(t);
        let sig = parse_sigspec(t)?;
        parse_eol(t)?;
        let (_, cell) = t.context_mut().cell.as_mut()?;
        cell.set_port(&port, sig);
    } else {
        let lhs = parse_sigspec(t)?;
        parse_blank(t);
        let rhs = parse_sigspec(t)?;
        parse_eol(t)?;
        if lhs.len() != rhs.len() {
            return None;
        }
        t.context_mut().module.as_mut()?.connect(lhs, rhs);
    }
    Some(())
}

fn parse_process(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "process")?;
    let name = parse_id(t)?;
    parse_eol(t)?;
    let ctx = t.context_mut();
    std::mem::take(&mut ctx.attrs);
    ctx.module.as_mut()?.processes.push(name);
    ctx.process_depth = 1;
    Some(())
}

fn parse_end(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> Option<()> {
    parse_keyword_expect(t, "end")?;
    parse_eol(t)?;
    let ctx = t.context_mut();
    if let Some((name, cell)) = ctx.cell.take() {
        ctx.module.as_mut()?.add_cell(name, cell).ok()?;
    } else {
        let mut module = ctx.module.take()?;
        ctx.port_ids.sort();
        module.ports = ctx.port_ids.iter().map(|&(_, id)| id).collect();
        ctx.design.add_module(module).ok()?;
    }
    Some(())
}

fn parse_line(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> bool {
    parse_blank(t);
    one_of!(t;
        parse_process_body(t).is_some(),
        parse_attribute(t).is_some(),
        parse_autoidx(t).is_some(),
        parse_module(t).is_some(),
        parse_parameter(t).is_some(),
        parse_wire(t).is_some(),
        parse_cell(t).is_some(),
        parse_connect(t).is_some(),
        parse_process(t).is_some(),
        parse_end(t).is_some(),
        t.token('\n')
    )
}

#[derive(Debug)]
pub struct ParseError {
    source: String,
    offset: usize,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rest = &self.source[self.offset..];
        let line = rest.lines().next().unwrap_or("");
        write!(f, "failed to parse near offset {}: {:?}", self.offset, line)
    }
}

impl std::error::Error for ParseError {}

/// Parses the textual netlist format written by [`Design`]'s `Display` implementation.
pub fn parse(source: &str) -> Result<Design, ParseError> {
    let mut tokens = source.into_tokens().with_context(Context::default());
    while parse_line(&mut tokens) {}
    parse_blank(&mut tokens);
    let (mut tokens, context) = tokens.into_parts();
    if !tokens.eof() || context.module.is_some() {
        return Err(ParseError { source: String::from(source), offset: tokens.location().offset() });
    }
    Ok(context.design)
}

impl FromStr for Design {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse(source)
    }
}
