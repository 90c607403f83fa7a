use super::*;
use crate::{
    siteinfo::MagicWord,
    wiki::{MemoryWiki, Source},
};
use time::macros::datetime;

/// The clock used by every test.
const NOW: OffsetDateTime = datetime!(2008-02-09 10:55:17 UTC);

#[track_caller]
fn expand_page(wiki: &MemoryWiki, page: &str, text: &str) -> String {
    let _ = env_logger::try_init();
    Expander::new(wiki, page)
        .unwrap()
        .with_now(NOW)
        .expand(text)
        .unwrap()
}

#[track_caller]
fn check(wiki: &MemoryWiki, text: &str, expected: &str) {
    assert_eq!(expand_page(wiki, "Test page", text), expected, "expanding {text:?}");
}

#[track_caller]
fn check_all(wiki: &MemoryWiki, cases: &[(&str, &str)]) {
    for (text, expected) in cases {
        check(wiki, text, expected);
    }
}

fn pipe_wiki() -> MemoryWiki {
    MemoryWiki::default().with_template("Pipe", "C")
}

#[test]
fn five_braces() {
    let wiki = MemoryWiki::default()
        .with_template("t1", "{{{{{1}}}}}")
        .with_template("tnext", "text of the tnext template");
    check(&wiki, "{{t1|tnext}}", "text of the tnext template");
}

#[test]
fn switch() {
    let wiki = MemoryWiki::default()
        .with_template("S", "{{#switch:{{{1}}}|{{{k}}}=dyn|x=lit|other}}")
        .with_template("Dyn", "{{{{{1}}}:{{{2}}}|a=1|b=2|none}}");
    check_all(&wiki, &[
        ("{{ #switch: +07 | 7 = Yes | 007 = Bond | No }}", "Yes"),
        ("{{#switch:b|a|b|c=X|Y}}", "X"),
        ("{{#switch:z|a=1|#default=D|b=2}}", "D"),
        ("{{#switch:z|a=1| No }}", "No"),
        ("{{#switch:z|#default|b=2}}", "2"),
        ("{{#switch:z|a=1}}", ""),
        ("{{#switch:&amp;|&=amp}}", "amp"),
        ("{{S|v|k=v}}", "dyn"),
        ("{{S|x|k=v}}", "lit"),
        ("{{S|q|k=v}}", "other"),
        ("{{Dyn|#switch|b}}", "2"),
        ("{{Dyn|#switch|c}}", "none"),
    ]);
}

#[test]
fn expressions() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{#expr:99999999999999+1}}", "1.0E+14"),
        ("{{#expr:0.1+0.9}}", "1"),
        ("{{#expr:2+3*4}}", "14"),
        ("{{#expr:}}", ""),
        ("{{#expr:1/0}}", r#"<strong class="error">Division by zero.</strong>"#),
        ("{{#ifexpr:1>0|yes|no}}", "yes"),
        ("{{#ifexpr:1<0|yes|no}}", "no"),
    ]);

    for expr in ["1+2", "12345678901*3", "-7*6", "100 mod 7", "2^10"] {
        let out = expand_page(&wiki, "Test page", &format!("{{{{#expr:{expr}}}}}"));
        assert!(!out.contains(['.', 'E']), "integer result of {expr} was {out}");
    }
}

#[test]
fn times() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{#time:Y-m-d|09 Feb 2008 10:55:17}}", "2008-02-09"),
        ("{{#time:xrY|4 March 2007}}", "MMVII"),
        ("{{#time:G:i|2008}}", "20:08"),
        ("{{#time:Y-m-d H:i}}", "2008-02-09 10:55"),
        ("{{#time:F|2008-03-01|de}}", "März"),
        ("{{#time:Y|garbage}}", r#"<strong class="error">Error: invalid time</strong>"#),
        ("{{#iferror:{{#time:Y|garbage}}|bad|good}}", "bad"),
    ]);
}

#[test]
fn local_times() {
    let _ = env_logger::try_init();
    let wiki = MemoryWiki::default();
    let mut expander = Expander::new(&wiki, "Test page")
        .unwrap()
        .with_now(datetime!(2008-02-09 23:30:00 -05:00));
    let text = "{{CURRENTDAY}} {{LOCALDAY}} {{CURRENTHOUR}} {{LOCALHOUR}} {{CURRENTDAYNAME}} {{LOCALDAYNAME}}";
    assert_eq!(expander.expand(text).unwrap(), "10 9 04 23 Sunday Saturday");
    assert_eq!(
        expander.expand("{{#time:H:i}} {{#timel:H:i}} {{#time:H:i||en|1}}").unwrap(),
        "04:30 23:30 23:30"
    );
}

#[test]
fn date_variables() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{CURRENTYEAR}}", "2008"),
        ("{{CURRENTMONTH}}-{{CURRENTMONTH2}}-{{CURRENTMONTH1}}", "02-02-2"),
        ("{{CURRENTMONTHNAME}} {{CURRENTMONTHNAMEGEN}} {{CURRENTMONTHABBREV}}", "February February Feb"),
        ("{{CURRENTDAY}} {{CURRENTDAY2}} {{CURRENTDOW}}", "9 09 6"),
        ("{{CURRENTTIME}} {{CURRENTHOUR}}", "10:55 10"),
        ("{{CURRENTTIMESTAMP}}", "20080209105517"),
        ("{{CURRENTWEEK}}", "6"),
        ("{{LOCALYEAR}}-{{LOCALMONTH}}-{{LOCALDAY2}}", "2008-02-09"),
        ("{{currentyear}}", "{{currentyear}}"),
    ]);
}

#[test]
fn implicit_newlines() {
    let wiki = MemoryWiki::default()
        .with_template("tt", "{|")
        .with_template("List", "* item");
    check_all(&wiki, &[
        ("foo {{tt}}", "foo \n{|"),
        ("{{tt}}", "{|"),
        ("foo\n{{tt}}", "foo\n{|"),
        ("a{{List}}{{List}}", "a\n* item\n* item"),
        ("a{{#if:1|# one}}", "a\n# one"),
        ("a{{#if:1|b}}", "ab"),
    ]);
}

#[test]
fn arguments_get_no_implicit_newline() {
    let wiki = MemoryWiki::default().with_template("Arg", "text{{{1}}}|{{{x|*d}}}");
    check_all(&wiki, &[
        ("{{Arg|*x}}", "text*x|*d"),
        ("{{Arg|#x|x=:y}}", "text#x|:y"),
        ("{{Arg|;x|x={{!}}}}", "text;x||"),
        ("a{{{1|*top}}}", "a*top"),
    ]);
}

#[test]
fn literal_regions() {
    let wiki = pipe_wiki().with_template("N", "x<nowiki>{{Pipe}}</nowiki>y");
    check_all(&wiki, &[
        ("<pre>A{{Pipe}}B</pre>", "<pre>A{{Pipe}}B</pre>"),
        ("a<nowiki></nowiki>b", "a<nowiki></nowiki>b"),
        ("{{Pipe}}<nowiki>{{Pipe}}</nowiki>", "C<nowiki>{{Pipe}}</nowiki>"),
        ("{{N}}", "x<nowiki>{{Pipe}}</nowiki>y"),
        ("{{uc:a<nowiki>b</nowiki>c}}", "A<nowiki>b</nowiki>C"),
    ]);
}

#[test]
fn boundaries() {
    let wiki = MemoryWiki::default()
        .with_template("T", "{{{1}}}")
        .with_template("Named", "[{{{x}}}]");
    check_all(&wiki, &[
        ("{{}}", ""),
        ("{{#if:|then|else}}", "else"),
        ("{{#if: | then | else }}", "else"),
        ("{{#if: x | then | else }}", "then"),
        ("{{#if:x|then}}", "then"),
        ("{{{x}}}", "{{{x}}}"),
        ("{{{x|def}}}", "def"),
        ("{{T|1=a|b}}", "b"),
        ("{{T|a|1=b}}", "b"),
        ("{{T| a }}", " a "),
        ("{{Named| x = y }}", "[y]"),
        ("{{T}}", "{{{1}}}"),
    ]);
}

#[test]
fn missing_templates() {
    let wiki = pipe_wiki();
    check_all(&wiki, &[
        ("{{Missing}}", "{{Missing}}"),
        ("{{Missing|a|b=c}}", "{{Missing|a|b=c}}"),
        ("{{Missing|{{Pipe}}}}", "{{Missing|C}}"),
    ]);
}

#[test]
fn caller_scope() {
    let wiki = MemoryWiki::default()
        .with_template("Outer", "{{Inner|{{{1}}}!|k={{{k|none}}}}}")
        .with_template("Inner", "{{{1}}}/{{{k}}}");
    check_all(&wiki, &[
        ("{{Outer|hi|k=v}}", "hi!/v"),
        ("{{Outer|hi}}", "hi!/none"),
    ]);
}

#[test]
fn template_loops() {
    let wiki = MemoryWiki::default()
        .with_template("Loop", "a{{Loop}}b")
        .with_template("A", "A{{B}}")
        .with_template("B", "B{{A}}");
    check_all(&wiki, &[("x{{Loop}}y", "xaby"), ("{{A}}", "A"), ("{{A}}{{A}}", "AA")]);
}

#[test]
fn recursion_limit() {
    let _ = env_logger::try_init();
    let wiki = MemoryWiki::default()
        .with_template("D1", "1{{D2}}")
        .with_template("D2", "2{{D3}}")
        .with_template("D3", "3{{D4}}")
        .with_template("D4", "4");
    let expand = |recursion_limit| {
        let limits = Limits {
            recursion_limit,
            ..Limits::default()
        };
        Expander::new(&wiki, "Test page")
            .unwrap()
            .with_limits(limits)
            .expand("{{D1}}")
            .unwrap()
    };
    assert_eq!(expand(4), "1234", "within the limit");
    assert_eq!(expand(3), "1", "truncated at depth 2");
}

#[test]
fn memory_limit() {
    let _ = env_logger::try_init();
    let wiki = MemoryWiki::default().with_template("T", "{{{1}}}");
    let limits = Limits {
        max_arg_size: 10,
        ..Limits::default()
    };
    let mut expander = Expander::new(&wiki, "Test page").unwrap().with_limits(limits);
    assert_eq!(expander.expand("{{T|short}}").unwrap(), "short");
    let err = expander.expand("{{T|aaaaaaaaaaaaaaaa}}").unwrap_err();
    assert!(
        matches!(err, Error::MemoryLimit { size: 16, limit: 10 }),
        "unexpected error {err:?}"
    );
    assert!(matches!(
        expander.expand("{{aaaaaaaaaaaaaaaa}}"),
        Err(Error::MemoryLimit { .. })
    ));
}

#[test]
fn cancellation() {
    let wiki = pipe_wiki();
    let cancel = CancelToken::new();
    let mut expander = Expander::new(&wiki, "Test page")
        .unwrap()
        .with_cancel(cancel.clone());
    assert_eq!(expander.expand("a{{Pipe}}").unwrap(), "aC");
    cancel.cancel();
    assert!(cancel.is_cancelled());
    assert_eq!(expander.expand("no templates").unwrap(), "no templates");
    assert!(matches!(expander.expand("a{{Pipe}}"), Err(Error::Cancelled)));
}

#[test]
fn parse_cache() {
    let _ = env_logger::try_init();
    let wiki = pipe_wiki().with_template("N", "<nowiki>{{Pipe}}</nowiki>{{{1|}}}");
    let cache = Arc::new(ParseCache::new(16));
    let text = "a{{N|{{Pipe}}}}<pre>{{N}}</pre>";
    let expand = || {
        Expander::new(&wiki, "Test page")
            .unwrap()
            .with_cache(Arc::clone(&cache))
            .expand(text)
            .unwrap()
    };
    let first = expand();
    let second = expand();
    assert_eq!(first, "a<nowiki>{{Pipe}}</nowiki>C<pre>{{N}}</pre>");
    assert_eq!(first, second, "cached trees give the same output");
    assert_eq!(cache.len(), 3, "top-level page, N, and Pipe");
}

#[test]
fn aliases() {
    let dutch = MagicWord {
        name: "if".into(),
        aliases: vec!["als".into()],
        case_sensitive: false,
    };
    let dutch_default = MagicWord {
        name: "default".into(),
        aliases: vec!["#standaard".into()],
        case_sensitive: false,
    };
    let mut siteinfo = (*Siteinfo::builtin()).clone();
    siteinfo.magicwords.extend([dutch, dutch_default]);
    let wiki = MemoryWiki::new(Arc::new(siteinfo));
    check_all(&wiki, &[
        ("{{#als:1|ja|nee}}", "ja"),
        ("{{#ALS:|ja|nee}}", "nee"),
        ("{{#if:1|yes}}", "yes"),
        ("{{#switch:q|a=1|#standaard=S}}", "S"),
    ]);

    let german = MagicWord {
        name: "if".into(),
        aliases: vec!["wenn".into()],
        case_sensitive: false,
    };
    let source = Source {
        language: Some("de".into()),
        magicwords: vec![german],
        locals: [("WIKIVAR".to_string(), "value".to_string())].into(),
    };
    let wiki = MemoryWiki::default().with_source("Seite", source);
    assert_eq!(
        expand_page(&wiki, "Seite", "{{#wenn:x|ja|nein}} {{CURRENTMONTHNAME}} {{WIKIVAR}}"),
        "ja Februar value"
    );
    assert_eq!(
        expand_page(&wiki, "Other", "{{#wenn:x|ja|nein}}"),
        "{{#wenn:x|ja|nein}}",
        "overrides only apply to their own page"
    );
}

#[test]
fn page_variables() {
    let wiki = MemoryWiki::default();
    let cases = [
        ("{{PAGENAME}}", "Foo bar/Baz/Qux"),
        ("{{FULLPAGENAME}}", "Help:Foo bar/Baz/Qux"),
        ("{{BASEPAGENAME}}", "Foo bar/Baz"),
        ("{{ROOTPAGENAME}}", "Foo bar"),
        ("{{SUBPAGENAME}}", "Qux"),
        ("{{NAMESPACE}} {{NAMESPACENUMBER}}", "Help 12"),
        ("{{TALKSPACE}} {{SUBJECTSPACE}} {{ARTICLESPACE}}", "Help talk Help Help"),
        ("{{TALKPAGENAME}}", "Help talk:Foo bar/Baz/Qux"),
        ("{{PAGENAMEE}}", "Foo_bar/Baz/Qux"),
        ("{{TALKSPACEE}}", "Help_talk"),
        ("{{PAGENAME:talk:some page}}", "Some page"),
        ("{{NAMESPACE:User talk:X}}", "User talk"),
        ("{{SUBJECTPAGENAME:User talk:X}}", "User:X"),
    ];
    for (text, expected) in cases {
        assert_eq!(expand_page(&wiki, "Help:Foo_bar/Baz/Qux", text), expected, "{text}");
    }

    let mut expander = Expander::new(&wiki, "Test page").unwrap().with_revision("1234");
    assert_eq!(
        expander
            .expand("{{DISPLAYTITLE:''Test''}}{{DEFAULTSORT:Page, Test}}{{REVISIONID}}")
            .unwrap(),
        "1234"
    );
    assert_eq!(expander.display_title(), Some("''Test''"));
    assert_eq!(expander.default_sort(), Some("Page, Test"));
}

#[test]
fn site_variables() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{SITENAME}}", "Wikipedia"),
        ("{{SERVER}}", "//en.wikipedia.org"),
        ("{{SERVERNAME}}", "en.wikipedia.org"),
        ("{{SCRIPTPATH}}", "/w"),
        ("{{CONTENTLANGUAGE}} {{CONTENTLANG}}", "en en"),
        ("{{!}}", "|"),
        ("{{NS:10}} {{ns:user}} {{NSE:11}}", "Template User Template_talk"),
        ("{{NS:Image}}", "File"),
    ]);
}

#[test]
fn urls() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{localurl:Main Page}}", "/wiki/Main_Page"),
        ("{{localurl:Main Page|action=edit}}", "/w/index.php?title=Main_Page&action=edit"),
        ("{{fullurl:Main Page}}", "//en.wikipedia.org/wiki/Main_Page"),
        ("{{canonicalurl:Main Page}}", "https://en.wikipedia.org/wiki/Main_Page"),
        ("{{fullurle:Main Page|a=1&b=2}}", "//en.wikipedia.org/w/index.php?title=Main_Page&amp;a=1&amp;b=2"),
        ("{{fullurl:wikt:word}}", "https://en.wiktionary.org/wiki/word"),
        ("{{localurl:Template:Foo}}", "/wiki/Template:Foo"),
        ("{{urlencode:a b&c}}", "a+b%26c"),
        ("{{urlencode:a b|PATH}}", "a%20b"),
        ("{{urlencode:a b|WIKI}}", "a_b"),
        ("{{anchorencode:a b}}", "a_b"),
    ]);
}

#[test]
fn strings() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{lc:ABC}} {{uc:abc}}", "abc ABC"),
        ("{{lcfirst:ABC}} {{ucfirst:abc}}", "aBC Abc"),
        ("{{padleft:7|3}}", "007"),
        ("{{padleft:7|5|ab}}", "abab7"),
        ("{{padright:x|3|-}}", "x--"),
        ("{{padleft:abc|2}}", "abc"),
        ("{{formatnum:1234567.89}}", "1,234,567.89"),
        ("{{formatnum:1,234|R}}", "1234"),
        ("{{formatnum:1234|NOSEP}}", "1234"),
        ("{{#titleparts:A/B/C/D|2}}", "A/B"),
        ("{{#titleparts:A/B/C/D|-1}}", "A/B/C"),
        ("{{#titleparts:A/B/C/D|1|-2}}", "C"),
        ("{{#titleparts:A/B/C/D}}", "A/B/C/D"),
    ]);
}

#[test]
fn rel2abs() {
    let wiki = MemoryWiki::default();
    check_all(&wiki, &[
        ("{{#rel2abs:../X|A/B/C}}", "A/B/X"),
        ("{{#rel2abs:./X|A/B}}", "A/B/X"),
        ("{{#rel2abs:/X|A}}", "A/X"),
        ("{{#rel2abs:Other|A}}", "Other"),
        ("{{#rel2abs:.}}", "Test page"),
        ("{{#rel2abs:/Sub}}", "Test page/Sub"),
        (
            "{{#rel2abs:../../..|A}}",
            r#"<strong class="error">Error: Invalid depth in path: "A/../../.." (tried to access a node above the root node).</strong>"#,
        ),
    ]);
}

#[test]
fn tags() {
    let wiki = pipe_wiki();
    check_all(&wiki, &[
        ("{{#tag:span|text|class=x}}", r#"<span class="x">text</span>"#),
        ("{{#tag:br}}", "<br />"),
        ("{{#tag:ref|x|name=\"a\"}}", r#"<ref name="a">x</ref>"#),
        ("{{#tag:nowiki|{{Pipe}}}}", "<nowiki>C</nowiki>"),
        ("{{#tag:}}", ""),
    ]);
}

#[test]
fn conditions() {
    let wiki = MemoryWiki::default()
        .with_page("Exists", "page")
        .with_template("Tpl", "template");
    check_all(&wiki, &[
        ("{{#ifeq:01|1|eq|ne}}", "eq"),
        ("{{#ifeq:a|b|eq|ne}}", "ne"),
        ("{{#ifeq: &amp; |&|eq|ne}}", "eq"),
        ("{{#iferror:{{#expr:1/0}}|bad|good}}", "bad"),
        ("{{#iferror: ok |bad}}", "ok"),
        ("{{#ifexist:Exists|y|n}}", "y"),
        ("{{#ifexist:Nope|y|n}}", "n"),
        ("{{#ifexist:Template:Tpl|y|n}}", "y"),
        ("{{#ifexist:Special:Foo|y|n}}", "n"),
        ("{{{{#if:1|#if}}:x|dynamic}}", "dynamic"),
    ]);
}

#[test]
fn substitution() {
    let wiki = pipe_wiki();
    check_all(&wiki, &[
        ("{{subst:Foo|a}}", "{{subst:Foo|a}}"),
        ("{{safesubst:Pipe}}", "C"),
        ("{{safesubst:#if:1|yes}}", "yes"),
    ]);
}

#[test]
fn transcluded_articles() {
    let wiki = MemoryWiki::default()
        .with_page("Article", "article <noinclude>hidden</noinclude>text")
        .with_page("Redirected", "#REDIRECT [[Article]]");
    check_all(&wiki, &[
        ("{{:Article}}", "article text"),
        ("{{:Redirected}}", "article text"),
    ]);
}
