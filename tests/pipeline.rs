use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use static_stack_lib as ss;
use ss::output::TableConf;
use ss::{Limit, Max, SortKey, State, Target, UnresolvedCall};


fn fixture(name: &str) -> BufReader<File>
{
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name].iter().collect();
    BufReader::new(File::open(path).unwrap())
}

fn analyzed() -> State
{
    State::analyze(Target::Mips32, fixture("blinky.lst")).unwrap()
}

fn table(s: &State, sort: SortKey, limit: Limit) -> String
{
    let mut out = Vec::new();
    s.output_table(&mut out, &TableConf { sort, limit, demangle: false }).unwrap();
    String::from_utf8(out).unwrap()
}

fn row_names(table: &str) -> Vec<String>
{
    table.lines()
        .skip(3)
        .map(|row| row.trim_start_matches('|').split('|').next().unwrap().trim().to_string())
        .collect()
}


#[test]
fn only_text_functions_are_discovered()
{
    let s = analyzed();
    let names: Vec<&str> = s.graph.records().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "led_init", "blink", "delay", "parse_expr", "parse_term"]);
}

#[test]
fn frames_and_depths()
{
    let s = analyzed();
    let get = |name: &str| s.graph.by_name(name).unwrap().clone();

    let delay = get("delay");
    assert_eq!((delay.own_stack, delay.deepest), (8, 8));
    // the countdown loop stays inside delay
    assert!(delay.calls.is_empty());

    let led_init = get("led_init");
    assert_eq!((led_init.own_stack, led_init.deepest), (16, 24));

    let blink = get("blink");
    assert_eq!((blink.own_stack, blink.deepest), (32, 40));
    assert!(blink.has_indirect_call);
    assert_eq!(blink.deepest_bound(), Max::LowerBound(40));

    let main = get("main");
    assert_eq!((main.own_stack, main.deepest), (24, 64));
    assert_eq!(main.calls, vec![0x9d000040, 0x9d000080]);
    assert_eq!(main.end, 0x9d00001c);
}

#[test]
fn recursion_terminates_with_partial_depth()
{
    let s = analyzed();

    let term = s.graph.by_name("parse_term").unwrap();
    let expr = s.graph.by_name("parse_expr").unwrap();

    // parse_term finishes first; its call back into parse_expr counts as zero
    assert_eq!(term.deepest, 24);
    assert_eq!(expr.deepest, 64);
    assert!(term.in_cycle && expr.in_cycle);
    // jump table dispatch is neither an edge nor an indirect call
    assert!(!term.has_indirect_call);

    assert_eq!(s.cycles, vec![vec![4, 5]]);
}

#[test]
fn unknown_targets_are_collected()
{
    let s = analyzed();
    assert_eq!(
        s.unresolved,
        vec![UnresolvedCall { caller: "parse_term".to_string(), target: 0x9d004000 }]
    );
}

#[test]
fn deepest_covers_own_and_callees()
{
    let s = analyzed();
    for f in s.graph.records()
    {
        assert!(f.deepest >= f.own_stack);
        if f.in_cycle
        {
            continue;
        }
        let callees = f.calls.iter()
            .filter_map(|&t| s.graph.function_at(t))
            .map(|i| s.graph.records()[i].deepest)
            .max()
            .unwrap_or(0);
        assert_eq!(f.deepest, f.own_stack + callees, "{}", f.name);
    }
}

#[test]
fn ranking_by_deepest()
{
    let s = analyzed();
    let out = table(&s, SortKey::Deepest, Limit::All);
    assert_eq!(
        row_names(&out),
        vec!["main", "parse_expr", "blink", "led_init", "parse_term", "delay"]
    );
}

#[test]
fn ranking_by_own()
{
    let s = analyzed();
    let out = table(&s, SortKey::Own, Limit::Count(4));
    assert_eq!(row_names(&out), vec!["parse_expr", "blink", "main", "parse_term"]);
}

#[test]
fn report_is_identical_across_runs()
{
    let first = table(&analyzed(), SortKey::Deepest, Limit::All);
    let second = table(&analyzed(), SortKey::Deepest, Limit::All);
    assert_eq!(first, second);
}

#[test]
fn malformed_label_names_its_line()
{
    let err = State::analyze(Target::Mips32, fixture("malformed.lst")).unwrap_err();
    assert!(matches!(err, ss::AnalyzeError::MalformedLabel { line: 10, .. }), "{:?}", err);
    assert!(err.to_string().contains("line 10"));
}
