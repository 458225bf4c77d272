use crate::tests::{pivots, try_pivots, CONFIGURATIONS};
use crate::{Choice, PivotError, Target};
use pretty_assertions::assert_eq;

#[test_log::test]
fn single_choice_compiles_to_the_package_property() {
    let p = pivots("configurations { platform { choices: { x86, x64 }; } }");

    assert_eq!(p.msbuild("x86").unwrap(), "'$(platform-zlib)' == 'x86'");
    assert_eq!(p.msbuild("!x86").unwrap(), "'$(platform-zlib)' != 'x86'");
}

#[test]
fn builtin_pivot_uses_its_key() {
    let p = pivots("configurations { platform { key: Platform; choices: { x86, x64 }; } }");

    assert_eq!(p.msbuild("x86").unwrap(), "'$(Platform)' == 'x86'");
    assert_eq!(p.pivot("platform").unwrap().property("zlib"), "Platform");
}

#[test_log::test]
fn operand_order_and_separators_do_not_matter() {
    let p = pivots(CONFIGURATIONS);

    for expression in [r"x86\debug", r"debug\x86", "debug/x86", "x86, debug", "debug && x86", "x86 debug"] {
        assert_eq!(p.path(expression).unwrap(), "x86/debug", "{expression}");
    }
    assert_eq!(p.label(r"debug\x86").unwrap(), "x86 & debug");
    assert_eq!(
        p.msbuild(r"debug\x86").unwrap(),
        "'$(platform-zlib)' == 'x86' And '$(configuration-zlib)' == 'debug'"
    );
    assert!(p.equivalent(r"x86\debug", r"debug\x86").unwrap());
    assert_eq!(p.canonical_expressions(), vec!["x86 & debug"]);
}

#[test]
fn choices_match_ignoring_case_and_through_aliases() {
    let p = pivots(CONFIGURATIONS);

    assert_eq!(p.label("X86").unwrap(), "x86");
    assert_eq!(p.label("Win32").unwrap(), "x86");
    assert_eq!(p.label("dbg & v141").unwrap(), "debug & v141");
    assert_eq!(p.used_choices("platform"), vec!["x86"]);
    assert_eq!(p.used_choices("toolset"), vec!["v141"]);
    assert!(p.used_choices("nothing").is_empty());
}

#[test]
fn choice_names_win_over_aliases() {
    let p = pivots(
        r#"
configurations {
    platform { choices: { x86, arm }; arm.aliases: { debug }; }
    configuration { choices: { debug, release }; }
}
"#,
    );

    assert_eq!(p.msbuild("debug").unwrap(), "'$(configuration-zlib)' == 'debug'");
}

#[test]
fn sets_of_choices() {
    let p = pivots(CONFIGURATIONS);

    assert_eq!(p.label("x64 | x86").unwrap(), "x86 | x64");
    assert_eq!(
        p.msbuild("x86 | x64").unwrap(),
        "'$(platform-zlib)' == 'x86' Or '$(platform-zlib)' == 'x64'"
    );
    assert_eq!(p.label("(x86 | x64) & debug").unwrap(), "(x86 | x64) & debug");
    assert_eq!(p.path("(x86 | x64) & debug").unwrap(), "x86,x64/debug");
    assert_eq!(
        p.msbuild("(x86 | x64) & debug").unwrap(),
        "('$(platform-zlib)' == 'x86' Or '$(platform-zlib)' == 'x64') And '$(configuration-zlib)' == 'debug'"
    );
    assert_eq!(p.label("!(x86 | x64)").unwrap(), "!(x86 | x64)");
    assert_eq!(
        p.msbuild("!x86 & !x64").unwrap(),
        "'$(platform-zlib)' != 'x86' And '$(platform-zlib)' != 'x64'"
    );
}

#[test_log::test]
fn distributed_forms_share_a_bucket() {
    let p = pivots(CONFIGURATIONS);

    assert!(p
        .equivalent("x86 & debug | x64 & debug", r"(x86 | x64)\debug")
        .unwrap());
    assert!(p.equivalent("!(x86 | debug)", "!x86 & !debug").unwrap());
    assert!(!p.equivalent("!x86", "x64").unwrap());
    assert_eq!(
        p.canonical("x64 & debug | debug & x86").unwrap(),
        "(x86 | x64) & debug"
    );
    assert_eq!(p.canonical_expressions().len(), 4);
}

#[test]
fn constant_expressions() {
    let p = pivots(CONFIGURATIONS);

    assert_eq!(p.label("").unwrap(), "");
    assert_eq!(p.msbuild("x86 | !x86").unwrap(), "");
    assert_eq!(p.label("x86 & x64").unwrap(), "false");
    assert_eq!(p.msbuild("x86 & x64").unwrap(), "false");
    assert_eq!(p.path("x86 & x64").unwrap(), "none");
}

#[test]
fn raw_msbuild_conditions_pass_through() {
    let p = pivots(CONFIGURATIONS);
    let raw = "'$(Platform)' == 'Win32' and x86";

    assert_eq!(p.msbuild(raw).unwrap(), raw);
    assert_eq!(p.compile(raw, Target::Path).unwrap(), raw);
    assert!(matches!(
        p.matches(raw, &[]),
        Err(PivotError::NotEvaluable { .. })
    ));
}

#[test]
fn choice_conditions_replace_the_comparison() {
    let p = pivots(
        r#"
configurations {
    platform {
        choices {
            Win32 { condition: "'$(Platform)' == 'Win32'"; }
            x64 { description: "64 bit"; }
        }
    }
}
"#,
    );

    assert_eq!(p.msbuild("win32").unwrap(), "('$(Platform)' == 'Win32')");
    assert_eq!(p.msbuild("!win32").unwrap(), "!('$(Platform)' == 'Win32')");
}

#[test]
fn malformed_expressions() {
    let p = pivots(CONFIGURATIONS);

    let err = p.msbuild("x86 & arm").unwrap_err();
    assert_eq!(
        err,
        PivotError::UnknownChoice {
            token: "arm".to_string(),
            expression: "x86 & arm".to_string(),
        }
    );
    assert_eq!(
        err.to_string(),
        "unmatched configuration choice `arm` in `x86 & arm`"
    );
    assert!(matches!(
        p.label("(x86 | x64"),
        Err(PivotError::UnbalancedParentheses { .. })
    ));
    assert!(matches!(
        p.label("x86 | | x64"),
        Err(PivotError::UnexpectedToken { .. })
    ));
}

#[test]
fn evaluation_against_settings() {
    let p = pivots(CONFIGURATIONS);

    assert!(p.matches("x86 & !debug", &[("platform", "x86")]).unwrap());
    assert!(p.matches("x86 & !debug", &[("Platform", "ia32"), ("configuration", "release")]).unwrap());
    assert!(!p.matches("x86 & !debug", &[("platform", "x86"), ("configuration", "dbg")]).unwrap());
    assert!(!p.matches("x64", &[]).unwrap());
    assert_eq!(
        p.matches("x64", &[("arch", "x64")]).unwrap_err(),
        PivotError::UnknownPivot {
            name: "arch".to_string()
        }
    );
}

#[test]
fn pivot_tables_are_read_from_the_sheet() {
    let p = pivots(CONFIGURATIONS);

    assert_eq!(
        p.pivots().iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["platform", "configuration", "toolset"]
    );
    let configuration = p.pivot("configuration").unwrap();
    assert_eq!(configuration.description.as_deref(), Some("build flavour"));
    assert_eq!(
        configuration.choices[0],
        Choice {
            name: "debug".to_string(),
            aliases: vec!["dbg".to_string()],
            description: Some("no optimizations".to_string()),
            condition: None,
        }
    );
    assert_eq!(
        p.pivot("platform").unwrap().choices[0].aliases,
        vec!["win32", "ia32"]
    );
    assert_eq!(
        p.pivot("toolset").unwrap().key.as_deref(),
        Some("PlatformToolset")
    );
}

#[test]
fn bad_configuration_tables() {
    assert!(matches!(
        try_pivots("configurations { platform { choices: { x86, X86 }; } }", "zlib"),
        Err(PivotError::DuplicateChoice { pivot, choice }) if pivot == "platform" && choice == "X86"
    ));
    assert!(matches!(
        try_pivots("nuget { version = 1; }", "zlib"),
        Err(PivotError::MissingConfigurations)
    ));
}
