//! Fixed runtime text surrounding the emitted functions.
//!
//! The preamble declares the libc imports and defines the print helpers the
//! `print` operation dispatches to; the generated `main` parses command-line
//! arguments and calls the program's `__main`. Both are opaque boilerplate
//! the lowering concatenates around its own output.

use std::fmt::Write as _;

use crate::ir::{Param, Type};

use super::context::llvm_type;

/// String constants, libc declarations, and print helper definitions.
const PRELUDE: &str = r#"target datalayout = "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-f80:128-n8:16:32:64-S128"
target triple = "x86_64-pc-linux-gnu"

@.str = private unnamed_addr constant [5 x i8] c"true\00", align 1
@.str.1 = private unnamed_addr constant [6 x i8] c"false\00", align 1
@.str.2 = private unnamed_addr constant [4 x i8] c"%ld\00", align 1
@.str.3 = private unnamed_addr constant [9 x i8] c"[object]\00", align 1
@.str.4 = private unnamed_addr constant [33 x i8] c"error: expected %d args, got %d\0A\00", align 1

; DECLARE LIBRARY CALLS
declare dso_local i32 @putchar(i32)
declare dso_local i32 @printf(i8*, ...)
declare dso_local void @exit(i32)
declare dso_local i64 @atol(i8*)
declare dso_local noalias i8* @malloc(i64)
declare dso_local void @free(i8*)

define dso_local i32 @btoi(i8* %0) #0 {
  %2 = alloca i8*, align 8
  store i8* %0, i8** %2, align 8
  %3 = load i8*, i8** %2, align 8
  %4 = load i8, i8* %3, align 1
  %5 = sext i8 %4 to i32
  %6 = icmp eq i32 %5, 116
  %7 = zext i1 %6 to i32
  ret i32 %7
}

define dso_local void @print_bool(i1 %0) {
  %2 = icmp ne i1 %0, 0
  br i1 %2, label %3, label %5

3:
  %4 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([5 x i8], [5 x i8]* @.str, i64 0, i64 0))
  br label %7

5:
  %6 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([6 x i8], [6 x i8]* @.str.1, i64 0, i64 0))
  br label %7

7:
  ret void
}

define dso_local void @print_space() {
  %1 = call i32 @putchar(i32 32)
  ret void
}

define dso_local void @print_newline() {
  %1 = call i32 @putchar(i32 10)
  ret void
}

define dso_local void @print_int(i64 %0) {
  %2 = alloca i64, align 8
  store i64 %0, i64* %2, align 8
  %3 = load i64, i64* %2, align 8
  %4 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([4 x i8], [4 x i8]* @.str.2, i64 0, i64 0), i64 %3)
  ret void
}

define dso_local void @print_ptr(i8* %0) {
  %2 = alloca i8*, align 8
  store i8* %0, i8** %2, align 8
  %3 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([9 x i8], [9 x i8]* @.str.3, i64 0, i64 0))
  ret void
}
"#;

/// The complete module preamble, labeled with the input's name.
#[must_use]
pub(crate) fn preamble(source_name: &str) -> String {
    format!("\n; ModuleID = '{source_name}'\nsource_filename = \"{source_name}\"\n{PRELUDE}")
}

/// Conversion of `argv[i + 1]` into `%a<i>` of the given IL type.
///
/// Integers go through `atol`; anything else is treated as a boolean and
/// tested for a leading `t` via `btoi`.
fn argv_conversion(index: usize, typ: &Type) -> String {
    if *typ == Type::Int {
        format!(
            "\n  %t{i}_0 = getelementptr inbounds i8*, i8** %12, i64 {next}\n  %t{i}_1 = load i8*, i8** %t{i}_0, align 8\n  %a{i} = call i64 @atol(i8* %t{i}_1)\n  ",
            i = index,
            next = index + 1,
        )
    } else {
        format!(
            "\n  %t{i}_0 = getelementptr inbounds i8*, i8** %12, i64 {next}\n  %t{i}_1 = load i8*, i8** %t{i}_0, align 8\n  %t{i}_2 = call i32 @btoi(i8* %t{i}_1)\n  %a{i} = trunc i32 %t{i}_2 to i1\n  ",
            i = index,
            next = index + 1,
        )
    }
}

/// The generated target `main`: checks the argument count (exiting 2 on a
/// mismatch), converts each argument per the IL `main`'s formals, and calls
/// `__main`.
#[must_use]
pub(crate) fn entry_main(params: &[Param]) -> String {
    let mut setup = String::new();
    let mut forwarded = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        setup.push_str(&argv_conversion(index, &param.typ));
        forwarded.push(format!("{} %a{index}", llvm_type(&param.typ)));
    }

    let count = params.len();
    let forwarded = forwarded.join(", ");

    let mut out = String::new();
    let _ = write!(
        out,
        r#"
define dso_local i32 @main(i32 %argc, i8** %argv) {{
  %1 = alloca i32, align 4
  %2 = alloca i32, align 4
  %3 = alloca i8**, align 8
  store i32 0, i32* %1, align 4
  store i32 %argc, i32* %2, align 4
  store i8** %argv, i8*** %3, align 8
  %4 = load i32, i32* %2, align 4
  %5 = sub nsw i32 %4, 1
  %6 = icmp ne i32 %5, {count}  ; NUM ARGS
  br i1 %6, label %7, label %11

7:
  %8 = load i32, i32* %2, align 4
  %9 = sub nsw i32 %8, 1
  %10 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([33 x i8], [33 x i8]* @.str.4, i64 0, i64 0), i32 {count}, i32 %9)
  call void @exit(i32 2) #3
  unreachable

11:
  %12 = load i8**, i8*** %3, align 8
{setup}
  call void @__main({forwarded})
  ret i32 0
}}
"#
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preamble_carries_source_name() {
        let text = preamble("prog.json");
        assert!(text.contains("; ModuleID = 'prog.json'"));
        assert!(text.contains("source_filename = \"prog.json\""));
        assert!(text.contains("declare dso_local noalias i8* @malloc(i64)"));
        assert!(text.contains("define dso_local void @print_int(i64 %0)"));
    }

    #[test]
    fn test_entry_main_without_params() {
        let text = entry_main(&[]);
        assert!(text.contains("icmp ne i32 %5, 0"));
        assert!(text.contains("call void @__main()"));
        assert!(text.contains("call void @exit(i32 2)"));
    }

    #[test]
    fn test_entry_main_converts_params() {
        let params = vec![
            Param {
                name: "n".to_string(),
                typ: Type::Int,
            },
            Param {
                name: "flag".to_string(),
                typ: Type::Bool,
            },
        ];
        let text = entry_main(&params);

        assert!(text.contains("icmp ne i32 %5, 2"));
        assert!(text.contains("%a0 = call i64 @atol(i8* %t0_1)"));
        assert!(text.contains("%t1_2 = call i32 @btoi(i8* %t1_1)"));
        assert!(text.contains("%a1 = trunc i32 %t1_2 to i1"));
        assert!(text.contains("call void @__main(i64 %a0, i1 %a1)"));
    }
}
