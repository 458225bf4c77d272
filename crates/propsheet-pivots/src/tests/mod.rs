mod expressions;

use crate::{PivotResult, Pivots};
use propsheet_syntax::parse_str;
use propsheet_view::Views;

pub(crate) const CONFIGURATIONS: &str = r#"
configurations {
    platform {
        choices: { x86, x64 };
        x86.aliases: { win32, ia32 };
    }
    configuration {
        description: "build flavour";
        choices {
            debug { aliases: { dbg }; description: "no optimizations"; }
            release { description: optimized; }
        }
    }
    toolset {
        key: PlatformToolset;
        choices: { v140, v141 };
    }
}
"#;

pub(crate) fn try_pivots(text: &str, package: &str) -> PivotResult<Pivots> {
    let document = parse_str(text).unwrap();
    let views = Views::from_node(&document.root);
    Pivots::from_root(views.root(), package)
}

pub(crate) fn pivots(text: &str) -> Pivots {
    try_pivots(text, "zlib").unwrap()
}
