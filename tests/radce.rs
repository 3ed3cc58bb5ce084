// Copyright (c) 2017-2021 Fabian Schuiki

use indoc::indoc;
use radce::{
    assembly::{parse_module, write_string_with_ranges},
    opt::prelude::*,
    pass::RangeDeadCodeElim,
};

/// Parse `input`, run the pass once, and return whether it changed anything
/// together with the resulting assembly.
fn optimize(input: &str) -> (bool, String) {
    let _ = env_logger::try_init();
    let (mut module, ranges) = parse_module(input).unwrap();
    module.verify();
    let changed = RangeDeadCodeElim::run_on_module(&PassContext::new(&ranges), &mut module);
    module.verify();
    (changed, write_string_with_ranges(&module, &ranges))
}

/// `%entry` compares `%x` against 5 and branches to `%then` or `%else`, with
/// `%then` falling through into `%else`. The range of `%x` is appended.
fn diamond(range: &str) -> String {
    let body = indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %c5 = const i32 5
            %cond = slt i32 %x, %c5
            br %cond, %then, %else
        %then:
            br %else
        %else:
            %r = phi i32 [%x, %entry], [%c5, %then]
            ret i32 %r
        }
    "};
    format!("{}range @f %x {}\n", body, range)
}

#[test]
fn decided_comparison_prunes_block() {
    let input = diamond("[10, 20]");
    let (changed, output) = optimize(&input);
    assert!(changed);
    assert_eq!(
        output,
        indoc! {"
            func @f (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = const i1 0
                br %else
            %else:
                %r = phi i32 [%x, %entry]
                ret i32 %r
            }
            range @f %x [10, 20]
        "}
    );
}

#[test]
fn overlapping_ranges_leave_function_alone() {
    let input = diamond("[0, 100]");
    let (changed, output) = optimize(&input);
    assert!(!changed);
    assert_eq!(output, input);
}

#[test]
fn pass_is_idempotent() {
    let input = diamond("[10, 20]");
    let (_, once) = optimize(&input);
    let (changed, twice) = optimize(&once);
    assert!(!changed);
    assert_eq!(once, twice);
}

#[test]
fn address_taken_block_is_kept() {
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
    let (changed, output) = optimize(input);
    assert!(changed);
    assert_eq!(
        output,
        indoc! {"
            func @f (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = const i1 0
                br %else
            %then: !addrtaken
                br %else
            %else:
                %r = phi i32 [%x, %entry], [%c5, %then]
                ret i32 %r
            }
            range @f %x [10, 20]
        "}
    );
}

#[test]
fn unsigned_and_equality_comparisons() {
    let input = indoc! {"
        func @g (i8 %a, i8 %b) i8 {
        %entry:
            %lt = ult i8 %a, %b
            br %lt, %small, %big
        %small:
            %ne = neq i8 %a, %b
            br %ne, %done, %same
        %same:
            ret i8 %a
        %big:
            ret i8 %b
        %done:
            ret i8 %b
        }
        range @g %a [0, 9]
        range @g %b [10, 20]
    "};
    let (changed, output) = optimize(input);
    assert!(changed);
    assert_eq!(
        output,
        indoc! {"
            func @g (i8 %a, i8 %b) i8 {
            %entry:
                %lt = const i1 1
                br %small
            %small:
                %ne = const i1 1
                br %done
            %done:
                ret i8 %b
            }
            range @g %a [0, 9]
            range @g %b [10, 20]
        "}
    );
}

#[test]
fn merge_reachable_through_other_path_survives() {
    let input = diamond("[-100, 4]");
    let (changed, output) = optimize(&input);
    assert!(changed);
    assert_eq!(
        output,
        indoc! {"
            func @f (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = const i1 1
                br %then
            %then:
                br %else
            %else:
                %r = phi i32 [%c5, %then]
                ret i32 %r
            }
            range @f %x [-100, 4]
        "}
    );
}

#[test]
fn functions_are_processed_independently() {
    let input = indoc! {"
        func @f (i32 %x) i32 {
        %entry:
            %c5 = const i32 5
            %cond = sgt i32 %x, %c5
            br %cond, %then, %else
        %then:
            ret i32 %x
        %else:
            ret i32 %c5
        }
        range @f %x [6, 7]

        func @g (i32 %x) i32 {
        %entry:
            %c5 = const i32 5
            %cond = sgt i32 %x, %c5
            br %cond, %then, %else
        %then:
            ret i32 %x
        %else:
            ret i32 %c5
        }
        range @g %x [5, 7]
    "};
    let (changed, output) = optimize(input);
    assert!(changed);
    assert_eq!(
        output,
        indoc! {"
            func @f (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = const i1 1
                br %then
            %then:
                ret i32 %x
            }
            range @f %x [6, 7]

            func @g (i32 %x) i32 {
            %entry:
                %c5 = const i32 5
                %cond = sgt i32 %x, %c5
                br %cond, %then, %else
            %then:
                ret i32 %x
            %else:
                ret i32 %c5
            }
            range @g %x [5, 7]
        "}
    );
}
