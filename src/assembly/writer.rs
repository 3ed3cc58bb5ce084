// Copyright (c) 2017-2021 Fabian Schuiki

//! Emitting IR assembly.

use crate::analysis::RangeTable;
use crate::ir::prelude::*;
use std::{
    collections::{HashMap, HashSet},
    io::{Result, Write},
    rc::Rc,
};

/// Temporary object to emit IR assembly.
pub struct Writer<T> {
    sink: T,
}

impl<T: Write> Writer<T> {
    /// Create a new assembly writer.
    pub fn new(sink: T) -> Self {
        Self { sink }
    }

    /// Emit assembly for a module.
    pub fn write_module(&mut self, module: &Module) -> Result<()> {
        self.write_module_with_ranges(module, &RangeTable::new())
    }

    /// Emit assembly for a module, followed by a `range` directive for every
    /// range recorded for the emitted values.
    pub fn write_module_with_ranges(&mut self, module: &Module, ranges: &RangeTable) -> Result<()> {
        let mut separate = false;
        for func in module.functions() {
            if separate {
                write!(self.sink, "\n")?;
            }
            separate = true;
            self.write_function(&module[func], ranges)?;
        }
        Ok(())
    }

    /// Emit assembly for a function and its ranges.
    pub fn write_function(&mut self, func: &Function, ranges: &RangeTable) -> Result<()> {
        let mut fw = FunctionWriter::new(self, func);
        write!(fw.writer.sink, "func @{} (", func.name)?;
        let mut comma = false;
        for arg in func.sig.args() {
            if comma {
                write!(fw.writer.sink, ", ")?;
            }
            comma = true;
            write!(fw.writer.sink, "{} ", func.sig.arg_type(arg))?;
            fw.write_value_name(func.dfg.arg_value(arg))?;
        }
        write!(fw.writer.sink, ") {} {{\n", func.sig.return_type())?;
        for block in func.blocks() {
            fw.write_block_value(block)?;
            write!(fw.writer.sink, ":")?;
            if func.is_address_taken(block) {
                write!(fw.writer.sink, " !addrtaken")?;
            }
            write!(fw.writer.sink, "\n")?;
            for inst in func.insts(block) {
                write!(fw.writer.sink, "    ")?;
                fw.write_inst(inst)?;
                write!(fw.writer.sink, "\n")?;
            }
        }
        write!(fw.writer.sink, "}}\n")?;

        // Only emit ranges of values that appear in the body, sorted for a
        // deterministic output.
        let mut func_ranges: Vec<_> = ranges
            .function_ranges(&func.name)
            .filter_map(|(value, range)| {
                fw.value_names
                    .get(&value)
                    .map(|name| (name.clone(), range))
            })
            .collect();
        func_ranges.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, range) in func_ranges {
            write!(
                fw.writer.sink,
                "range @{} %{} [{}, {}]\n",
                func.name,
                name,
                range.lower(),
                range.upper()
            )?;
        }
        Ok(())
    }
}

/// Emits a single function, picking unique names for its values and blocks.
pub struct FunctionWriter<'a, T> {
    writer: &'a mut Writer<T>,
    func: &'a Function,
    value_names: HashMap<Value, Rc<String>>,
    block_names: HashMap<Block, Rc<String>>,
    name_indices: HashMap<Rc<String>, usize>,
    names: HashSet<Rc<String>>,
    tmp_index: usize,
}

impl<'a, T: Write> FunctionWriter<'a, T> {
    /// Create a new writer for a function.
    pub fn new(writer: &'a mut Writer<T>, func: &'a Function) -> Self {
        Self {
            writer,
            func,
            value_names: Default::default(),
            block_names: Default::default(),
            name_indices: Default::default(),
            names: Default::default(),
            tmp_index: 0,
        }
    }

    /// Emit the name of a value.
    pub fn write_value_name(&mut self, value: Value) -> Result<()> {
        if self.func.dfg[value].is_undef() {
            return write!(self.writer.sink, "undef");
        }

        // If we have already picked a name for the value, use that.
        if let Some(name) = self.value_names.get(&value) {
            return write!(self.writer.sink, "%{}", name);
        }

        // Check if the value has an explicit name set, or if we should just
        // generate a temporary name.
        let name = self.uniquify_name(self.func.dfg.get_name(value));

        // Emit the name and associate it with the value for later reuse.
        write!(self.writer.sink, "%{}", name)?;
        self.value_names.insert(value, name);
        Ok(())
    }

    /// Emit the name of a BB as used in labels and branches.
    pub fn write_block_value(&mut self, block: Block) -> Result<()> {
        // If we have already picked a name for the block, use that.
        if let Some(name) = self.block_names.get(&block) {
            return write!(self.writer.sink, "%{}", name);
        }

        let name = self.uniquify_name(self.func.cfg.get_name(block));
        write!(self.writer.sink, "%{}", name)?;
        self.block_names.insert(block, name);
        Ok(())
    }

    /// Uniquify a value or block name.
    fn uniquify_name(&mut self, name: Option<&str>) -> Rc<String> {
        if let Some(requested_name) = name {
            let requested_name = Rc::new(requested_name.to_string());
            let idx = self.name_indices.entry(requested_name.clone()).or_insert(0);
            loop {
                let name = if *idx == 0 {
                    requested_name.clone()
                } else {
                    Rc::new(format!("{}{}", requested_name, idx))
                };
                *idx += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        } else {
            loop {
                let name = Rc::new(format!("{}", self.tmp_index));
                self.tmp_index += 1;
                if self.names.insert(name.clone()) {
                    break name;
                }
            }
        }
    }

    /// Emit the use of a value.
    pub fn write_value_use(&mut self, value: Value, with_type: bool) -> Result<()> {
        if with_type {
            write!(self.writer.sink, "{} ", self.func.dfg.value_type(value))?;
        }
        self.write_value_name(value)
    }

    /// Emit an instruction.
    pub fn write_inst(&mut self, inst: Inst) -> Result<()> {
        let func = self.func;
        if func.dfg.has_result(inst) {
            self.write_value_name(func.dfg.inst_result(inst))?;
            write!(self.writer.sink, " = ")?;
        }
        let data = &func.dfg[inst];
        match data {
            InstData::ConstInt { opcode, imm } => {
                write!(self.writer.sink, "{} {}", opcode, imm)?;
            }
            InstData::Phi { opcode, args, bbs } => {
                write!(self.writer.sink, "{} {}", opcode, func.dfg.inst_type(inst))?;
                let mut comma = false;
                for (&arg, &bb) in args.iter().zip(bbs.iter()) {
                    if comma {
                        write!(self.writer.sink, ",")?;
                    }
                    comma = true;
                    write!(self.writer.sink, " [")?;
                    self.write_value_use(arg, false)?;
                    write!(self.writer.sink, ", ")?;
                    self.write_block_value(bb)?;
                    write!(self.writer.sink, "]")?;
                }
            }
            InstData::Branch { opcode, args, bbs } => {
                write!(self.writer.sink, "{} ", opcode)?;
                self.write_value_use(args[0], false)?;
                for &bb in bbs {
                    write!(self.writer.sink, ", ")?;
                    self.write_block_value(bb)?;
                }
            }
            InstData::Jump { opcode, bbs } => {
                write!(self.writer.sink, "{} ", opcode)?;
                self.write_block_value(bbs[0])?;
            }
            InstData::Nullary { opcode } => {
                write!(self.writer.sink, "{}", opcode)?;
            }
            InstData::Unary { opcode, .. } | InstData::Binary { opcode, .. } => {
                write!(self.writer.sink, "{} ", opcode)?;
                let mut first = true;
                for &arg in data.args() {
                    if !first {
                        write!(self.writer.sink, ", ")?;
                    }
                    self.write_value_use(arg, first)?;
                    first = false;
                }
            }
        }
        Ok(())
    }
}

/// Emit a module as a string.
pub fn write_string(module: &Module) -> String {
    write_string_with_ranges(module, &RangeTable::new())
}

/// Emit a module and its ranges as a string.
pub fn write_string_with_ranges(module: &Module, ranges: &RangeTable) -> String {
    let mut asm = vec![];
    Writer::new(&mut asm)
        .write_module_with_ranges(module, ranges)
        .expect("writing to a vector cannot fail");
    String::from_utf8(asm).expect("assembly is valid utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Range;
    use crate::assembly::parse_module;
    use crate::ty::int_ty;
    use indoc::indoc;

    #[test]
    fn loopback() {
        let input = indoc! {"
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
        "};
        let (module, ranges) = parse_module(input).unwrap();
        assert_eq!(write_string_with_ranges(&module, &ranges), input);
    }

    #[test]
    fn ranges_sorted_by_name() {
        let (module, ranges) = parse_module(indoc! {"
            func @s (i8 %z, i8 %a) i8 {
            %entry:
                ret i8 %z
            }
            range @s %z [1, 2]
            range @s %a [-2, -1]
        "})
        .unwrap();
        assert_eq!(
            write_string_with_ranges(&module, &ranges),
            indoc! {"
                func @s (i8 %z, i8 %a) i8 {
                %entry:
                    ret i8 %z
                }
                range @s %a [-2, -1]
                range @s %z [1, 2]
            "}
        );
    }

    #[test]
    fn temporaries_and_duplicate_names() {
        let mut sig = Signature::new();
        sig.add_input(int_ty(8));
        sig.add_input(int_ty(8));
        sig.set_return_type(int_ty(8));
        let mut func = Function::new("t", sig);
        let a = func.arg_value(0);
        let b = func.arg_value(1);
        func.dfg.set_name(a, "v".to_string());
        func.dfg.set_name(b, "v".to_string());
        let mut builder = FunctionBuilder::new(&mut func);
        let bb = builder.block();
        builder.append_to(bb);
        let sum = builder.ins().add(a, b);
        let undef = builder.dfg.add_undef(int_ty(8));
        let sum2 = builder.ins().sub(sum, undef);
        builder.ins().ret_value(sum2);
        let mut module = Module::new();
        module.add_function(func);

        let mut ranges = RangeTable::new();
        ranges.insert("t", b, Range::signed(8, -3, 3));
        assert_eq!(
            write_string_with_ranges(&module, &ranges),
            indoc! {"
                func @t (i8 %v, i8 %v1) i8 {
                %0:
                    %1 = add i8 %v, %v1
                    %2 = sub i8 %1, undef
                    ret i8 %2
                }
                range @t %v1 [-3, 3]
            "}
        );
    }
}
