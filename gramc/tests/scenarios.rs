use compiler::{
    at_least_one, compile_grammar, compile_product, compile_rule, compile_terminalizer,
    parser_bindings, Binder, DerivedTypes, Terminals,
};
use gramc::Language;
use grammar::{families, Grammar, RuleType};
use parsegen::{Expr, Parser, Position, Predicate, Token, Value};

fn chars(t: &Terminals) -> Vec<char> {
    t.clone().into_vec().iter().map(|t| t.ch).collect()
}

/// Digit = Terminal(digit), Digits = Plus(Digit), Sp = Terminal(space),
/// MaybeSp = Opt(Sp), Pair = Record([MaybeSp, Digits]).
fn scenario_grammar() -> Grammar {
    let mut b = Grammar::builder();
    let digit = b.rule("Digit", RuleType::Terminal(Predicate::Digit)).unwrap();
    let digits = b.rule("Digits", RuleType::Plus(digit)).unwrap();
    let sp = b.rule("Sp", RuleType::Terminal(Predicate::Space)).unwrap();
    let maybe_sp = b.rule("MaybeSp", RuleType::Opt(sp)).unwrap();
    b.rule("Pair", RuleType::Record(vec![maybe_sp, digits])).unwrap();
    b.build().unwrap()
}

#[test]
fn scenario_a_digits() {
    let g = scenario_grammar();
    let lang = Language::from_grammar(g.clone(), "Digits").unwrap();

    let value = lang.parse("123").unwrap();
    assert_eq!(value.to_string(), "['1' '2' '3']");

    let out = lang.terminalize(&value).unwrap();
    match &out {
        Terminals::Nonempty(n) => {
            assert_eq!(n.head, Token::new('1', Position::start()));
            assert_eq!(n.tail.len(), 2);
        }
        other => panic!("expected nonempty, got {:?}", other),
    }
    assert_eq!(chars(&out), vec!['1', '2', '3']);
    assert_eq!(out.into_vec(), Token::stream("123"));

    assert!(at_least_one(&g, g.lookup("Digits").unwrap()));
    assert!(lang.at_least_one("Digits").unwrap());
}

#[test]
fn scenario_b_optional_space() {
    let g = scenario_grammar();
    let lang = Language::from_grammar(g.clone(), "MaybeSp").unwrap();
    assert!(!at_least_one(&g, g.lookup("MaybeSp").unwrap()));

    let value = lang.parse("").unwrap();
    assert_eq!(
        value,
        Value::Opt {
            rule: "MaybeSp".into(),
            inner: None,
        }
    );
    assert_eq!(lang.terminalize(&value).unwrap(), Terminals::Possibly(vec![]));

    // Present but still typed as possibly empty.
    let value = lang.parse(" ").unwrap();
    assert_eq!(
        lang.terminalize(&value).unwrap(),
        Terminals::Possibly(Token::stream(" "))
    );
}

#[test]
fn scenario_c_prefix_splice() {
    let g = scenario_grammar();
    let lang = Language::from_grammar(g.clone(), "Pair").unwrap();
    assert!(at_least_one(&g, g.lookup("Pair").unwrap()));

    let value = lang.parse(" 7").unwrap();
    let out = lang.terminalize(&value).unwrap();
    match &out {
        // The possibly-empty space is spliced onto the head of the digits.
        Terminals::Nonempty(n) => {
            assert_eq!(n.head.ch, ' ');
            assert_eq!(n.head.position.column, 1);
            assert_eq!(n.tail.iter().map(|t| t.ch).collect::<Vec<_>>(), vec!['7']);
            assert_eq!(n.tail[0].position.column, 2);
        }
        other => panic!("expected nonempty, got {:?}", other),
    }
    assert_eq!(out.into_vec(), Token::stream(" 7"));

    let value = lang.parse("7").unwrap();
    assert_eq!(chars(&lang.terminalize(&value).unwrap()), vec!['7']);
}

const SHARED: &str = "
    left  = ( ancestor x ) ;
    right = ( y ancestor ) ;
    ancestor \"a number\" = digit+ ;
    digit = @digit ;
    x = 'x' ;
    y = 'y' ;
";

#[test]
fn scenario_d_shared_ancestor() {
    let g: Grammar = SHARED.parse().unwrap();
    let types = DerivedTypes::new(&g);
    let left = g.lookup("left").unwrap();
    let right = g.lookup("right").unwrap();
    let ancestor = g.lookup("ancestor").unwrap();

    // Compiled separately for each root, the ancestor's binding is the same
    // expression up to identifier numbering.
    let emitted = |root| {
        let mut binder = Binder::new();
        binder.rule(&g, root);
        let bindings = compile_rule(&types, &mut binder, &g, ancestor).unwrap();
        bindings[0].expr.clone().map_refs(|ident| ident.hint().to_owned())
    };
    let from_left = emitted(left);
    assert_eq!(from_left, emitted(right));
    assert!(matches!(from_left, Expr::Label(ref desc, _) if desc == "a number"));

    // Compiled together, it is bound exactly once and both roots refer to
    // that one binding.
    let mut binder = Binder::new();
    let bindings = parser_bindings(&types, &mut binder, &g, &families(&g, &[left, right])).unwrap();
    let ident = binder.rule(&g, ancestor);
    assert_eq!(bindings.iter().filter(|b| b.ident == ident).count(), 1);
    for root in [left, right] {
        let root_ident = binder.rule(&g, root);
        let binding = bindings.iter().find(|b| b.ident == root_ident).unwrap();
        assert!(binding.expr.refs().contains(&&ident));
    }

    let product = compile_product(&types, &|name| name.to_owned(), &g, &[left, right]).unwrap();
    assert_eq!(
        product.labels().iter().filter(|l| *l == "ancestor").count(),
        1
    );
    assert_eq!(product.parse("left", "12x").unwrap().to_string(), "(left ['1' '2'] 'x')");
    assert_eq!(product.parse("right", "y3").unwrap().to_string(), "(right 'y' ['3'])");
    assert_eq!(product.parse("ancestor", "45").unwrap().to_string(), "['4' '5']");
}

#[test]
fn separate_compiles_agree_with_product() {
    let g: Grammar = SHARED.parse().unwrap();
    let types = DerivedTypes::new(&g);
    let left = g.lookup("left").unwrap();

    let single = compile_grammar(&types, &g, left).unwrap();
    let product = Language::from_grammar(g.clone(), "left")
        .unwrap()
        .product(&["left", "right"])
        .unwrap();
    assert_eq!(
        single.parse("9x").unwrap(),
        product.parse("left", "9x").unwrap()
    );

    let term = compile_terminalizer(&types, &g, left).unwrap();
    let value = product.parse("left", "90x").unwrap();
    assert_eq!(term.terminalize(&value).unwrap().text(), "90x");
}

#[test]
fn left_recursive_grammar_from_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/grammars/arith.gram");
    let lang = Language::from_file(path, "expr").unwrap();

    let value = lang.parse("1-2-3").unwrap();
    // Left associative.
    match &value {
        Value::Branch { branch, fields, .. } => {
            assert_eq!(branch, "Sub");
            assert!(matches!(&fields[0], Value::Branch { branch, .. } if branch == "Sub"));
        }
        other => panic!("unexpected value {}", other),
    }
    assert_eq!(lang.round_trip(" ( 12 )*3 ").unwrap(), " ( 12 )*3 ");

    let err = lang.parse("1 + ").unwrap_err();
    assert!(err.to_string().contains("expr"), "{}", err);
    assert!(format!("{:#}", err).contains("@digit"), "{:#}", err);
}
