// Copyright (c) 2017-2021 Fabian Schuiki

use indoc::indoc;
use radce::{
    assembly::{parse_module, parse_str, write_string, write_string_with_ranges},
    verifier::Verifier,
};

fn loopback(input: &str) {
    let (module, ranges) = parse_module(input).unwrap();
    assert_eq!(write_string_with_ranges(&module, &ranges), input);
}

#[test]
fn empty_module() {
    loopback("");
}

#[test]
fn multiple_functions() {
    loopback(indoc! {"
        func @a () void {
        %entry:
            ret
        }

        func @b (i16 %p, i16 %q) i16 {
        %entry:
            %s = add i16 %p, %q
            %d = sub i16 %s, %q
            %e = eq i16 %d, %p
            br %e, %yes, %no
        %yes:
            ret i16 %s
        %no:
            ret i16 %d
        }
        range @b %p [-4, 4]
        range @b %q [0, 1]
    "});
}

#[test]
fn block_addresses() {
    loopback(indoc! {"
        func @c () i64 {
        %entry:
            %addr = blockaddr %target
            br %target
        %target: !addrtaken
            ret i64 %addr
        }
    "});
}

#[test]
fn comments_and_temporaries() {
    let module = parse_str(indoc! {"
        ; leading comment
        func @t (i8 %0) i8 {
        %1:
            %2 = add i8 %0, %0 ; trailing comment
            ret i8 %2
        }
    "})
    .unwrap();
    assert_eq!(
        write_string(&module),
        indoc! {"
            func @t (i8 %0) i8 {
            %1:
                %2 = add i8 %0, %0
                ret i8 %2
            }
        "}
    );
}

#[test]
fn parsed_function_is_verified() {
    // The phi misses an entry for `%entry`.
    let module = parse_str(indoc! {"
        func @v (i8 %x) i8 {
        %entry:
            br %next
        %next:
            %r = phi i8
            ret i8 %r
        }
    "})
    .unwrap();
    let mut verifier = Verifier::new();
    verifier.verify_module(&module);
    let errs = verifier.finish().unwrap_err();
    assert_eq!(errs.len(), 1, "{}", errs);
}

#[test]
fn range_of_unknown_value_is_an_error() {
    let err = parse_module(indoc! {"
        func @u (i8 %x) i8 {
        %entry:
            ret i8 %x
        }
        range @u %y [0, 1]
    "})
    .unwrap_err();
    assert!(format!("{:#}", err).contains("unknown value %y"), "{:#}", err);
}

#[test]
fn range_must_fit_value_type() {
    let err = parse_module(indoc! {"
        func @u (i8 %x) i8 {
        %entry:
            ret i8 %x
        }
        range @u %x [0, 128]
    "})
    .unwrap_err();
    assert!(format!("{:#}", err).contains("not a valid range"), "{:#}", err);
}
