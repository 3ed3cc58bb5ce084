// Copyright (c) 2017-2021 Fabian Schuiki

//! Parsing of IR assembly.
//!
//! The assembly is line-based. A function starts with a `func` header, lists
//! its blocks as `%label:` lines each followed by its indented instructions,
//! and ends with a closing brace. `range` directives after a function attach
//! a value range to one of its values.

use crate::{
    analysis::{Range, RangeTable},
    ir::{prelude::*, InstBuilder},
    ty::{int_ty, void_ty, Type},
    value::IntValue,
};
use anyhow::{anyhow, bail, Context, Result};
use num::BigInt;
use regex::Regex;
use std::collections::HashMap;

/// Parse a module and the value ranges annotated in it.
pub fn parse_module(input: &str) -> Result<(Module, RangeTable)> {
    Parser::new().parse(input)
}

/// Parse a module, ignoring any value ranges.
pub fn parse_str(input: &str) -> Result<Module> {
    Ok(parse_module(input)?.0)
}

struct Parser {
    func_re: Regex,
    arg_re: Regex,
    label_re: Regex,
    range_re: Regex,
    inst_re: Regex,
    phi_entry_re: Regex,
}

/// The names defined in a parsed function.
#[derive(Default)]
struct Names {
    values: HashMap<String, Value>,
    blocks: HashMap<String, Block>,
}

impl Parser {
    fn new() -> Self {
        let name = r"[\w.$]+";
        let compile = |re: String| Regex::new(&re).expect("assembly regex is valid");
        Self {
            func_re: compile(format!(
                r"^func\s+@({0})\s*\(([^)]*)\)\s*(\w+)\s*\{{$",
                name
            )),
            arg_re: compile(format!(r"^(\w+)\s+%({})$", name)),
            label_re: compile(format!(r"^%({}):\s*(!addrtaken)?$", name)),
            range_re: compile(format!(
                r"^range\s+@({0})\s+%({0})\s+\[\s*(-?\d+)\s*,\s*(-?\d+)\s*\]$",
                name
            )),
            inst_re: compile(format!(r"^(?:%({})\s*=\s*)?(\w+)(?:\s+(.*))?$", name)),
            phi_entry_re: compile(format!(r"^\[\s*(\S+)\s*,\s*%({})\s*\]$", name)),
        }
    }

    fn parse(&self, input: &str) -> Result<(Module, RangeTable)> {
        let mut module = Module::new();
        let mut ranges = RangeTable::new();
        let mut names: HashMap<String, (ModFunction, Names)> = HashMap::new();
        let mut lines = input
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, strip_comment(line).trim()))
            .filter(|(_, line)| !line.is_empty());

        while let Some((lineno, line)) = lines.next() {
            if line.starts_with("func") {
                let header = (lineno, line);
                let mut body = vec![];
                loop {
                    match lines.next() {
                        Some((_, "}")) => break,
                        Some(line) => body.push(line),
                        None => bail!("line {}: function is missing its closing `}}`", lineno),
                    }
                }
                let (func, func_names) = self.parse_function(header, &body)?;
                if names.contains_key(&func.name) {
                    bail!("line {}: function @{} defined multiple times", lineno, func.name);
                }
                let name = func.name.clone();
                let key = module.add_function(func);
                names.insert(name, (key, func_names));
            } else if line.starts_with("range") {
                self.parse_range(line, &module, &names, &mut ranges)
                    .with_context(|| format!("line {}: `{}`", lineno, line))?;
            } else {
                bail!("line {}: expected `func` or `range`, found `{}`", lineno, line);
            }
        }

        Ok((module, ranges))
    }

    fn parse_function(
        &self,
        (lineno, header): (usize, &str),
        body: &[(usize, &str)],
    ) -> Result<(Function, Names)> {
        let caps = self
            .func_re
            .captures(header)
            .ok_or_else(|| anyhow!("line {}: malformed function header `{}`", lineno, header))?;
        let mut names = Names::default();

        // Build the signature.
        let mut sig = Signature::new();
        let mut arg_names = vec![];
        for arg in caps[2].split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let arg_caps = self
                .arg_re
                .captures(arg)
                .ok_or_else(|| anyhow!("line {}: malformed argument `{}`", lineno, arg))?;
            let ty = parse_type(&arg_caps[1]).with_context(|| format!("line {}", lineno))?;
            sig.add_input(ty);
            arg_names.push(arg_caps[2].to_string());
        }
        sig.set_return_type(parse_type(&caps[3]).with_context(|| format!("line {}", lineno))?);

        let mut func = Function::new(&caps[1], sig);
        for (index, name) in arg_names.into_iter().enumerate() {
            let value = func.arg_value(index);
            if names.values.insert(name.clone(), value).is_some() {
                bail!("line {}: argument %{} defined multiple times", lineno, name);
            }
            set_value_name(&mut func, value, name);
        }

        // Create the blocks up front such that branches may refer to blocks
        // further down.
        let mut builder = FunctionBuilder::new(&mut func);
        for &(lineno, line) in body {
            if let Some(caps) = self.label_re.captures(line) {
                let name = caps[1].to_string();
                if names.blocks.contains_key(&name) {
                    bail!("line {}: block %{} defined multiple times", lineno, name);
                }
                let bb = builder.named_block(name.clone());
                if caps.get(2).is_some() {
                    builder.set_address_taken(bb);
                }
                names.blocks.insert(name, bb);
            }
        }

        // Build the instructions.
        let mut placeholders = HashMap::new();
        let mut in_block = false;
        for &(lineno, line) in body {
            if let Some(caps) = self.label_re.captures(line) {
                builder.append_to(names.blocks[&caps[1]]);
                in_block = true;
                continue;
            }
            if !in_block {
                bail!("line {}: instruction `{}` outside of a block", lineno, line);
            }
            let mut ctx = FunctionContext {
                names: &mut names,
                placeholders: &mut placeholders,
            };
            self.parse_inst(line, &mut builder, &mut ctx)
                .with_context(|| format!("line {}: `{}`", lineno, line))?;
        }
        if let Some(name) = placeholders.keys().next() {
            bail!(
                "line {}: value %{} is used but never defined in @{}",
                lineno,
                name,
                builder.name
            );
        }

        Ok((func, names))
    }

    fn parse_inst(
        &self,
        line: &str,
        builder: &mut FunctionBuilder,
        ctx: &mut FunctionContext,
    ) -> Result<()> {
        let caps = self
            .inst_re
            .captures(line)
            .ok_or_else(|| anyhow!("malformed instruction"))?;
        let result_name = caps.get(1).map(|m| m.as_str().to_string());
        let mnemonic = &caps[2];
        let operands = caps.get(3).map(|m| m.as_str()).unwrap_or("");

        let result = match mnemonic {
            "const" => {
                let (ty, rest) = split_type(operands)?;
                let width = int_width(&ty)?;
                let imm: BigInt = rest
                    .parse()
                    .map_err(|_| anyhow!("invalid integer literal `{}`", rest))?;
                if !fits_int(&imm, width) {
                    bail!("{} does not fit into {}", imm, ty);
                }
                Some(named(builder, &result_name).const_int(IntValue::from_signed(width, imm)))
            }
            "add" | "sub" => {
                let (ty, rest) = split_type(operands)?;
                int_width(&ty)?;
                let (x, y) = match split_list(rest)[..] {
                    [x, y] => (ctx.value(builder, x, &ty)?, ctx.value(builder, y, &ty)?),
                    _ => bail!("expected two operands"),
                };
                let mut ins = named(builder, &result_name);
                Some(if mnemonic == "add" {
                    ins.add(x, y)
                } else {
                    ins.sub(x, y)
                })
            }
            "phi" => {
                let (ty, rest) = split_type(operands)?;
                let mut args = vec![];
                let mut bbs = vec![];
                for entry in split_entries(rest)? {
                    let caps = self
                        .phi_entry_re
                        .captures(entry)
                        .ok_or_else(|| anyhow!("malformed phi entry `{}`", entry))?;
                    args.push(ctx.value(builder, &caps[1], &ty)?);
                    bbs.push(ctx.block(&caps[2])?);
                }
                Some(named(builder, &result_name).phi_of(ty, args, bbs))
            }
            "blockaddr" => {
                let bb = ctx.block(parse_label(operands)?)?;
                Some(named(builder, &result_name).block_addr(bb))
            }
            "ret" if operands.is_empty() => {
                builder.ins().ret();
                None
            }
            "ret" => {
                let (ty, rest) = split_type(operands)?;
                let x = ctx.value(builder, rest, &ty)?;
                builder.ins().ret_value(x);
                None
            }
            "br" => {
                match split_list(operands)[..] {
                    [target] => {
                        let bb = ctx.block(parse_label(target)?)?;
                        builder.ins().br(bb);
                    }
                    [cond, if_true, if_false] => {
                        let cond = ctx.value(builder, cond, &int_ty(1))?;
                        let if_true = ctx.block(parse_label(if_true)?)?;
                        let if_false = ctx.block(parse_label(if_false)?)?;
                        builder.ins().br_cond(cond, if_true, if_false);
                    }
                    _ => bail!("expected one or three operands"),
                }
                None
            }
            _ => match Opcode::comparison_from_str(mnemonic) {
                Some(opcode) => {
                    let (ty, rest) = split_type(operands)?;
                    int_width(&ty)?;
                    let (x, y) = match split_list(rest)[..] {
                        [x, y] => (ctx.value(builder, x, &ty)?, ctx.value(builder, y, &ty)?),
                        _ => bail!("expected two operands"),
                    };
                    Some(named(builder, &result_name).compare(opcode, x, y))
                }
                None => bail!("unknown instruction `{}`", mnemonic),
            },
        };

        match (result_name, result) {
            (Some(name), Some(value)) => ctx.define(builder, name, value),
            (Some(name), None) => bail!("`{}` yields no value to assign to %{}", mnemonic, name),
            (None, Some(_)) => bail!("result of `{}` must be named", mnemonic),
            (None, None) => Ok(()),
        }
    }

    fn parse_range(
        &self,
        line: &str,
        module: &Module,
        names: &HashMap<String, (ModFunction, Names)>,
        ranges: &mut RangeTable,
    ) -> Result<()> {
        let caps = self
            .range_re
            .captures(line)
            .ok_or_else(|| anyhow!("malformed range directive"))?;
        let (key, func_names) = names
            .get(&caps[1])
            .ok_or_else(|| anyhow!("unknown function @{}", &caps[1]))?;
        let func = &module[*key];
        let value = *func_names
            .values
            .get(&caps[2])
            .ok_or_else(|| anyhow!("unknown value %{} in @{}", &caps[2], func.name))?;
        let ty = func.dfg.value_type(value);
        let width = int_width(&ty)?;
        let lower: BigInt = caps[3].parse()?;
        let upper: BigInt = caps[4].parse()?;
        let range = Range::try_signed(width, lower, upper)
            .ok_or_else(|| anyhow!("[{}, {}] is not a valid range of {}", &caps[3], &caps[4], ty))?;
        if ranges.insert(func.name.clone(), value, range).is_some() {
            bail!("range of %{} given multiple times", &caps[2]);
        }
        Ok(())
    }
}

/// Forward references and names of the function being parsed.
struct FunctionContext<'a> {
    names: &'a mut Names,
    placeholders: &'a mut HashMap<String, Value>,
}

impl FunctionContext<'_> {
    /// Resolve a value operand of the given type.
    ///
    /// Values used before their definition are represented by a placeholder
    /// until the definition is parsed.
    fn value(&mut self, builder: &mut FunctionBuilder, operand: &str, ty: &Type) -> Result<Value> {
        if operand == "undef" {
            return Ok(builder.dfg.add_undef(ty.clone()));
        }
        let name = parse_value_name(operand)?;
        let value = match self.names.values.get(name) {
            Some(&value) => value,
            None => {
                let value = builder.dfg.add_placeholder(ty.clone());
                self.names.values.insert(name.to_string(), value);
                self.placeholders.insert(name.to_string(), value);
                value
            }
        };
        let actual = builder.dfg.value_type(value);
        if actual != *ty {
            bail!("%{} is of type {}, but used as {}", name, actual, ty);
        }
        Ok(value)
    }

    /// Resolve a block operand.
    fn block(&self, name: &str) -> Result<Block> {
        self.names
            .blocks
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown block %{}", name))
    }

    /// Associate a name with a newly defined value.
    fn define(&mut self, builder: &mut FunctionBuilder, name: String, value: Value) -> Result<()> {
        if let Some(ph) = self.placeholders.remove(&name) {
            let expected = builder.dfg.value_type(ph);
            let actual = builder.dfg.value_type(value);
            if expected != actual {
                bail!("%{} is of type {}, but was used as {}", name, actual, expected);
            }
            builder.replace_use(ph, value);
            builder.dfg.remove_placeholder(ph);
        } else if self.names.values.contains_key(&name) {
            bail!("%{} defined multiple times", name);
        }
        self.names.values.insert(name.clone(), value);
        set_value_name(builder, value, name);
        Ok(())
    }
}

/// Start building an instruction, named if its result is.
fn named<'a, 'b>(builder: &'b mut FunctionBuilder<'a>, name: &Option<String>) -> InstBuilder<'a, 'b> {
    let ins = builder.ins();
    match name {
        Some(name) if !is_temporary(name) => ins.name(name.clone()),
        _ => ins,
    }
}

/// Assign a name to a value, unless it is a numbered temporary.
fn set_value_name(func: &mut Function, value: Value, name: String) {
    if !is_temporary(&name) {
        func.dfg.set_name(value, name);
    }
}

fn is_temporary(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_digit())
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(index) => &line[..index],
        None => line,
    }
}

fn parse_type(input: &str) -> Result<Type> {
    if input == "void" {
        return Ok(void_ty());
    }
    if input.starts_with('i') {
        if let Ok(width) = input[1..].parse::<usize>() {
            if width > 0 {
                return Ok(int_ty(width));
            }
        }
    }
    bail!("invalid type `{}`", input)
}

fn int_width(ty: &Type) -> Result<usize> {
    if ty.is_int() {
        Ok(ty.unwrap_int())
    } else {
        bail!("expected an integer type, found {}", ty)
    }
}

/// Check whether a literal fits into `width` bits, in either the signed or
/// the unsigned interpretation.
fn fits_int(value: &BigInt, width: usize) -> bool {
    let min = -(BigInt::from(1) << (width - 1));
    let max = (BigInt::from(1) << width) - 1;
    *value >= min && *value <= max
}

/// Split off the leading type of an operand list.
fn split_type(input: &str) -> Result<(Type, &str)> {
    let mut parts = input.splitn(2, char::is_whitespace);
    let ty = parse_type(parts.next().unwrap_or(""))?;
    Ok((ty, parts.next().unwrap_or("").trim()))
}

/// Split a comma-separated list of operands.
fn split_list(input: &str) -> Vec<&str> {
    if input.trim().is_empty() {
        return vec![];
    }
    input.split(',').map(str::trim).collect()
}

/// Split a comma-separated list of bracketed phi entries.
fn split_entries(input: &str) -> Result<Vec<&str>> {
    let mut entries = vec![];
    let mut rest = input.trim();
    while !rest.is_empty() {
        let end = rest
            .find(']')
            .ok_or_else(|| anyhow!("unterminated phi entry `{}`", rest))?;
        entries.push(rest[..=end].trim());
        rest = rest[end + 1..].trim_start();
        if rest.starts_with(',') {
            rest = rest[1..].trim_start();
        } else if !rest.is_empty() {
            bail!("expected `,` between phi entries, found `{}`", rest);
        }
    }
    Ok(entries)
}

fn parse_value_name(operand: &str) -> Result<&str> {
    if operand.starts_with('%') && operand.len() > 1 {
        Ok(&operand[1..])
    } else {
        bail!("expected a value, found `{}`", operand)
    }
}

fn parse_label(operand: &str) -> Result<&str> {
    if operand.starts_with('%') && operand.len() > 1 {
        Ok(&operand[1..])
    } else {
        bail!("expected a block, found `{}`", operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parse_function_and_ranges() {
        let (module, ranges) = parse_module(indoc! {"
            func @f (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = slt i32 %x, %c5
                br %cond, %then, %else
            %then: !addrtaken
                br %else
            %else:
                %r = phi i32 [%x, %entry], [%c5, %then]
                ret i32 %r
            }
            range @f %x [10, 20]
        "})
        .unwrap();
        let f = module.lookup_function("f").unwrap();
        let func = &module[f];
        func.verify();
        let bbs: Vec<_> = func.blocks().collect();
        assert_eq!(bbs.len(), 3);
        assert!(func.is_address_taken(bbs[1]));
        assert_eq!(func.successors(bbs[0]), &[bbs[1], bbs[2]]);
        assert_eq!(
            ranges.get("f", func.arg_value(0)),
            Some(&Range::signed(32, 10, 20))
        );
    }

    #[test]
    fn forward_references_resolve() {
        let (module, _) = parse_module(indoc! {"
            func @loop (i8 %n) void {
            %entry:
                %zero = const i8 0
                br %head
            %head:
                %i = phi i8 [%zero, %entry], [%next, %head]
                %one = const i8 1
                %next = add i8 %i, %one
                %done = eq i8 %next, %n
                br %done, %exit, %head
            %exit:
                ret
            }
        "})
        .unwrap();
        let func = &module[module.lookup_function("loop").unwrap()];
        func.verify();
        assert!(func
            .dfg
            .values
            .values()
            .all(|data| !data.is_placeholder()));
    }

    #[test]
    fn negative_constants_wrap() {
        let (module, _) = parse_module(indoc! {"
            func @g () i8 {
            %entry:
                %m = const i8 -1
                ret i8 %m
            }
        "})
        .unwrap();
        let func = &module[module.lookup_function("g").unwrap()];
        let inst = func.all_insts().next().unwrap();
        let imm = func.dfg[inst].get_const_int().unwrap();
        assert_eq!(imm.value, num::BigUint::from(255u32));
        assert_eq!(imm.to_signed(), BigInt::from(-1));
    }

    #[test]
    fn undefined_value_is_an_error() {
        let err = parse_module(indoc! {"
            func @h () i8 {
            %entry:
                ret i8 %nope
            }
        "})
        .unwrap_err();
        assert!(err.to_string().contains("%nope"), "{}", err);
    }

    #[test]
    fn unknown_block_is_an_error() {
        let err = parse_module(indoc! {"
            func @h () void {
            %entry:
                br %nowhere
            }
        "})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("unknown block %nowhere"), "{:#}", err);
    }

    #[test]
    fn invalid_range_is_an_error() {
        let err = parse_module(indoc! {"
            func @h (i8 %x) void {
            %entry:
                ret
            }
            range @h %x [0, 300]
        "})
        .unwrap_err();
        assert!(format!("{:#}", err).contains("not a valid range"), "{:#}", err);
    }
}
