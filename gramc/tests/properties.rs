use gramc::Language;
use parsegen::{Parser, Token};
use proptest::prelude::*;

const ARITH: &str = include_str!("../grammars/arith.gram");

const PAIR: &str = "
    pair = ( maybe_sp digits ) ;
    maybe_sp = sp? ;
    sp = @space ;
    digits = digit+ ;
    digit = @digit ;
";

fn arith_input() -> impl Strategy<Value = String> {
    let leaf = ("[ ]{0,2}", "[0-9]{1,3}", "[ ]{0,2}").prop_map(|(a, d, b)| format!("{}{}{}", a, d, b));
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(vec!['+', '-', '*']), inner.clone())
                .prop_map(|(l, op, r)| format!("{}{}{}", l, op, r)),
            ("[ ]{0,1}", inner, "[ ]{0,1}").prop_map(|(a, e, b)| format!("{}({}){}", a, e, b)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arith_round_trip(input in arith_input()) {
        let lang = Language::new(ARITH, "expr").unwrap();
        let value = lang.parse(&input).unwrap();
        let out = lang.terminalize(&value).unwrap();

        prop_assert!(out.is_nonempty_shape());
        prop_assert_eq!(out.into_vec(), Token::stream(&input));
    }

    #[test]
    fn pair_round_trip(input in " ?[0-9]{1,8}") {
        let lang = Language::new(PAIR, "pair").unwrap();
        prop_assert_eq!(lang.round_trip(&input).unwrap(), input.clone());

        let value = lang.parse(&input).unwrap();
        let out = lang.terminalize(&value).unwrap();
        prop_assert!(out.is_nonempty_shape());
        prop_assert_eq!(out.len(), input.chars().count());
    }

    #[test]
    fn rejected_inputs_stay_rejected(input in "[a-z]{1,4}") {
        let lang = Language::new(PAIR, "pair").unwrap();
        prop_assert!(lang.parse(&input).is_err());
    }
}
