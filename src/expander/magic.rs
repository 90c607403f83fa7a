//! Magic word and parser function implementations.
//!
//! <https://www.mediawiki.org/wiki/Help:Magic_words>
//! <https://www.mediawiki.org/wiki/Help:Extension:ParserFunctions>

// Clippy: Functions signatures all conform to a specific API; inline modules
// are clearer with wildcard import.
#![allow(clippy::unnecessary_wraps, clippy::wildcard_imports)]

use super::{Expander, Result, args::IndexedArgs};
use crate::{
    common::{UrlStyle, anchor_encode, decode_html, format_number, unformat_number, url_encode},
    expr,
    parser::SwitchNode,
    php::{DateNames, DateTime, fuzzy_cmp},
    title::{Namespace, Title},
    uniq::{MARKER_PREFIX, Uniquifier},
};
use core::{
    fmt::{self, Write as _},
    iter,
};
use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};
use ::time::OffsetDateTime;

/// The function signature of a parser function.
pub(super) type ParserFn = fn(&mut String, &mut Expander<'_>, &IndexedArgs<'_>) -> Result;

/// The marker emitted in place of an unusable date.
const INVALID_TIME: &str = r#"<strong class="error">Error: invalid time</strong>"#;

/// The widest padding `PADLEFT` and `PADRIGHT` will produce.
const MAX_PAD: usize = 500;

mod cond {
    //! Flow control parser functions.

    use super::*;

    /// `{{#expr: expression}}`
    pub fn expr(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(expr) = arguments.eval(ex, 0)?.map(trim) {
            match on_error_resume_next(expr::evaluate(&expr)) {
                Ok(Some(result)) => write!(out, "{result}")?,
                Ok(None) => {}
                Err(err) => out.push_str(&err),
            }
        }

        Ok(())
    }

    /// `{{#if: condition | consequent (!condition.trim().is_empty()) | alternate }}`
    pub fn r#if(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let cond = arguments.eval(ex, 0)?.unwrap_or_default();
        let index = 1 + usize::from(!is_truthy(&cond));
        if let Some(value) = arguments.eval(ex, index)?.map(trim) {
            out.push_str(&value);
        }

        Ok(())
    }

    /// `{{#ifeq: lhs | rhs | consequent (lhs == rhs) | alternate }}`
    pub fn if_eq(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let lhs = arguments.eval(ex, 0)?.map_or("".into(), decode_trim);
        let rhs = arguments.eval(ex, 1)?.map_or("".into(), decode_trim);
        let is_eq = fuzzy_cmp(&lhs, &rhs);
        if let Some(value) = arguments.eval(ex, 2 + usize::from(!is_eq))?.map(trim) {
            out.push_str(&value);
        }

        Ok(())
    }

    /// `{{#iferror: condition | consequent (error) | alternate (no error) }}`
    pub fn if_error(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        static I_AM_BAD: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"<(?:strong|span|p|div)\s(?:[^\s>]*\s+)*?class="(?:[^"\s>]*\s+)*?error(?:\s[^">]*)?""#).unwrap()
        });

        let lhs = arguments.eval(ex, 0)?.unwrap_or_default();
        if I_AM_BAD.is_match(&lhs) {
            if let Some(value) = arguments.eval(ex, 1)?.map(trim) {
                out.push_str(&value);
            }
        } else if let Some(value) = arguments.eval(ex, 2)?.map(trim) {
            out.push_str(&value);
        } else {
            out.push_str(lhs.trim_ascii());
        }

        Ok(())
    }

    /// `{{#ifexpr: expression | consequent (expression != 0) | alternate }}`
    pub fn if_expr(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let expr = arguments.eval(ex, 0)?.unwrap_or_default();
        match on_error_resume_next(expr::evaluate(&expr)) {
            Ok(result) => {
                let is_true = result.is_some_and(|result| result.is_truthy());
                if let Some(value) = arguments.eval(ex, 1 + usize::from(!is_true))?.map(trim) {
                    out.push_str(&value);
                }
            }
            Err(err) => out.push_str(&err),
        }

        Ok(())
    }

    /// `{{#switch: match | case [| case ...] = value | default }}`
    ///
    /// Calls whose function name was not known until it was expanded end up
    /// here. They get the same case tables as calls which were recognised
    /// when the page was parsed.
    pub fn switch(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let node = SwitchNode::new(
            arguments.first_node(),
            arguments.arguments.raw().to_vec(),
            &ex.aliases,
        );
        let value = ex.switch(&node, arguments.arguments.scope())?;
        out.push_str(&value);
        Ok(())
    }
}

mod ext {
    //! Tag parser functions.

    use super::*;

    /// `{{#tag: tag_name [| content [| attribute = value ...]] }}`
    pub fn tag(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let Some(name) = arguments.eval(ex, 0)? else {
            return Ok(());
        };
        let name = Uniquifier::kill(&name).trim_ascii().to_ascii_lowercase();
        if name.is_empty() {
            return Ok(());
        }
        let content = arguments.eval(ex, 1)?;

        let mut tag = format!("<{name}");
        let attributes = &arguments.arguments;
        for index in 1..attributes.len() {
            let Some(key) = attributes.name(ex, index)? else {
                continue;
            };
            let key = key.trim_ascii();
            if key.is_empty() {
                continue;
            }
            let value = attributes.value(ex, index)?.unwrap_or_default();
            let value = unquote(value.trim_ascii());
            write!(
                tag,
                r#" {key}="{}""#,
                html_escape::encode_double_quoted_attribute(value)
            )?;
        }

        if let Some(content) = content {
            write!(tag, ">{content}</{name}>")?;
        } else {
            tag += " />";
        }

        out.push_str(&ex.uniq.replace(&tag));
        Ok(())
    }

    /// Removes one level of matching quotes from an attribute value.
    fn unquote(value: &str) -> &str {
        ['"', '\'']
            .into_iter()
            .find_map(|quote| value.strip_prefix(quote)?.strip_suffix(quote))
            .unwrap_or(value)
    }
}

mod page {
    //! Page information parser functions.

    use super::*;

    /// `{{PAGENAME[: title] }}` and the other variables which extract part
    /// of a title, along with their URL-encoded `…E` forms.
    pub fn title_part(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let (part, encode) = match arguments.callee {
            callee @ ("namespacee" | "talkspacee" | "subjectspacee" | "articlespacee"
            | "pagenamee" | "fullpagenamee" | "basepagenamee" | "rootpagenamee"
            | "subpagenamee" | "talkpagenamee" | "subjectpagenamee"
            | "articlepagenamee") => (&callee[..callee.len() - 1], true),
            callee => (callee, false),
        };

        let title = title_arg(ex, arguments)?;
        let ns = ex.nshandler.namespace(title.namespace());
        let text = match part {
            "pagename" => Some(Cow::Borrowed(title.text())),
            "fullpagename" => Some(Cow::Borrowed(title.full_text())),
            "basepagename" => Some(Cow::Borrowed(title.base_text())),
            "rootpagename" => Some(Cow::Borrowed(title.root_text())),
            "subpagename" => Some(Cow::Borrowed(title.subpage_text())),
            "namespace" => ex
                .nshandler
                .get_nsname_by_number(title.namespace())
                .map(Cow::Borrowed),
            "namespacenumber" => Some(Cow::Owned(title.namespace().to_string())),
            "talkspace" => ns
                .and_then(Namespace::talk_id)
                .and_then(|id| ex.nshandler.get_nsname_by_number(id))
                .map(Cow::Borrowed),
            "subjectspace" | "articlespace" => ns
                .map(Namespace::subject_id)
                .and_then(|id| ex.nshandler.get_nsname_by_number(id))
                .map(Cow::Borrowed),
            "talkpagename" => ex.nshandler.talk_page(&title).map(Cow::Owned),
            "subjectpagename" | "articlepagename" => {
                ex.nshandler.subject_page(&title).map(Cow::Owned)
            }
            _ => None,
        };

        if let Some(text) = text {
            if encode {
                out.push_str(&url_encode(&text, UrlStyle::Wiki));
            } else {
                out.push_str(&text);
            }
        }
        Ok(())
    }

    /// `{{REVISIONID}}`
    pub fn revision_id(out: &mut String, ex: &mut Expander<'_>, _: &IndexedArgs<'_>) -> Result {
        if let Some(revision) = &ex.revision {
            out.push_str(revision);
        }
        Ok(())
    }

    /// `{{DISPLAYTITLE: title }}` or `{{DEFAULTSORT: key }}`
    pub fn set_page_var(
        _: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            let value = value.into_owned();
            if arguments.callee == "displaytitle" {
                ex.display_title = Some(value);
            } else {
                ex.default_sort = Some(value);
            }
        }
        Ok(())
    }

    /// Returns the title given as the first argument, or the title of the
    /// page being expanded.
    fn title_arg(ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result<Title> {
        Ok(match arguments.eval(ex, 0)?.map(trim) {
            Some(text) if !text.is_empty() => ex.nshandler.title(&text, Namespace::MAIN),
            _ => ex.title.clone(),
        })
    }
}

mod site {
    //! Site information variables.

    use super::*;

    /// `{{CONTENTLANGUAGE}}`
    pub fn content_language(
        out: &mut String,
        ex: &mut Expander<'_>,
        _: &IndexedArgs<'_>,
    ) -> Result {
        let language = ex.language.as_deref().unwrap_or(&ex.siteinfo.general.lang);
        out.push_str(language);
        Ok(())
    }

    /// `{{SCRIPTPATH}}`
    pub fn script_path(out: &mut String, ex: &mut Expander<'_>, _: &IndexedArgs<'_>) -> Result {
        out.push_str(ex.siteinfo.script_path());
        Ok(())
    }

    /// `{{SERVER}}`
    pub fn server(out: &mut String, ex: &mut Expander<'_>, _: &IndexedArgs<'_>) -> Result {
        out.push_str(ex.siteinfo.server());
        Ok(())
    }

    /// `{{SERVERNAME}}`
    pub fn server_name(out: &mut String, ex: &mut Expander<'_>, _: &IndexedArgs<'_>) -> Result {
        out.push_str(ex.siteinfo.server_name());
        Ok(())
    }

    /// `{{SITENAME}}`
    pub fn site_name(out: &mut String, ex: &mut Expander<'_>, _: &IndexedArgs<'_>) -> Result {
        out.push_str(&ex.siteinfo.general.sitename);
        Ok(())
    }
}

mod string {
    //! String manipulation functions.

    use super::*;

    /// `{{anchorencode: text }}`
    pub fn anchor_encode(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(text) = arguments.eval(ex, 0)?.map(trim) {
            let text = Uniquifier::kill(&text);
            out.push_str(&super::anchor_encode(&text));
        }

        Ok(())
    }

    /// `{{formatnum: number [| R | NOSEP] }}`
    pub fn format_number(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(n) = arguments.eval(ex, 0)?.map(trim)
            && !n.is_empty()
        {
            let flag = arguments.eval(ex, 1)?.map(trim).unwrap_or_default();
            if !matches!(&*flag, "" | "R" | "NOSEP") {
                log::warn!("formatnum: unsupported flag {flag}");
            }

            out.push_str(&Uniquifier::for_each_non_marker(&n, |text| match &*flag {
                "R" => unformat_number(text).into_owned(),
                "NOSEP" => text.to_string(),
                _ => super::format_number(text).into_owned(),
            }));
        }

        Ok(())
    }

    /// `{{lc: string }}`
    pub fn lc(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            out.push_str(&Uniquifier::for_each_non_marker(&value, str::to_lowercase));
        }
        Ok(())
    }

    /// `{{lcfirst: string }}`
    pub fn lc_first(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            map_first(out, &value, |c| c.to_lowercase().collect());
        }
        Ok(())
    }

    /// `{{padleft: string | length [| padding value] }}` or
    /// `{{padright: string | length [| padding value] }}`
    pub fn pad(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let value = arguments.eval(ex, 0)?.map(trim).unwrap_or_default();
        let len = arguments
            .eval(ex, 1)?
            .and_then(|len| len.trim_ascii().parse::<usize>().ok())
            .map_or(0, |len| len.min(MAX_PAD));
        let value_len = value.chars().count();
        if value_len >= len {
            out.push_str(&value);
            return Ok(());
        }

        let pad = arguments.eval(ex, 2)?.map_or(Cow::Borrowed("0"), trim);
        if pad.is_empty() {
            out.push_str(&value);
            return Ok(());
        }
        let padding = iter::repeat(&*pad)
            .flat_map(str::chars)
            .take(len - value_len)
            .collect::<String>();
        if arguments.callee == "padleft" {
            out.push_str(&padding);
            out.push_str(&value);
        } else {
            out.push_str(&value);
            out.push_str(&padding);
        }
        Ok(())
    }

    /// `{{#rel2abs: path [| base path] }}`
    pub fn rel2abs(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let to = arguments.eval(ex, 0)?.unwrap_or_default();
        let to = to.trim_end_matches([' ', '/']);
        let from = arguments.eval(ex, 1)?.map(trim).unwrap_or_default();
        let from = if from.is_empty() {
            ex.title.full_text()
        } else {
            &from
        };

        if to.is_empty() || to == "." {
            out.push_str(from);
            return Ok(());
        }

        let is_relative =
            to.starts_with('/') || to.starts_with("./") || to.starts_with("../") || to == "..";
        if !is_relative {
            out.push_str(to);
            return Ok(());
        }

        let mut parts = Vec::new();
        for part in from.split('/').chain(to.split('/')) {
            match part {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        write!(
                            out,
                            r#"<strong class="error">Error: Invalid depth in path: "{}" (tried to access a node above the root node).</strong>"#,
                            html_escape::encode_text(&format!("{from}/{to}"))
                        )?;
                        return Ok(());
                    }
                }
                part => parts.push(part),
            }
        }
        out.push_str(&parts.join("/"));
        Ok(())
    }

    /// `{{#titleparts: title [| count [| start]] }}`
    pub fn title_parts(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let page_name = arguments.eval(ex, 0)?.map(trim).unwrap_or_default();
        let page_name = decode_html(&page_name);
        let count = arguments
            .eval(ex, 1)?
            .map_or(0, |n| n.trim_ascii().parse::<isize>().unwrap_or(0));
        let start = arguments
            .eval(ex, 2)?
            .map_or(1, |n| n.trim_ascii().parse::<isize>().unwrap_or(1));

        let parts = page_name.split('/').collect::<Vec<_>>();
        let start = match start {
            ..0 => parts.len().saturating_sub(start.unsigned_abs()),
            0 => 0,
            start => start.unsigned_abs() - 1,
        };
        let rest = parts.get(start..).unwrap_or_default();
        let take = match count {
            ..0 => rest.len().saturating_sub(count.unsigned_abs()),
            0 => rest.len(),
            count => count.unsigned_abs(),
        };

        for (index, part) in rest.iter().take(take).enumerate() {
            if index != 0 {
                out.push('/');
            }
            out.push_str(part);
        }

        Ok(())
    }

    /// `{{uc: string }}`
    pub fn uc(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            out.push_str(&Uniquifier::for_each_non_marker(&value, str::to_uppercase));
        }
        Ok(())
    }

    /// `{{ucfirst: string }}`
    pub fn uc_first(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            map_first(out, &value, |c| c.to_uppercase().collect());
        }
        Ok(())
    }

    /// `{{urlencode: string [| QUERY | WIKI | PATH] }}`
    pub fn url_encode(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            let style = match arguments.eval(ex, 1)?.map(trim).as_deref() {
                Some("WIKI") => UrlStyle::Wiki,
                Some("PATH") => UrlStyle::Path,
                _ => UrlStyle::Query,
            };
            out.push_str(&super::url_encode(&value, style));
        }
        Ok(())
    }

    /// Writes `value` with its first character mapped by `f`. Text which
    /// starts with a placeholder marker is left alone.
    fn map_first(out: &mut String, value: &str, f: impl FnOnce(char) -> String) {
        let mut chars = value.chars();
        match chars.next() {
            Some(first) if !value.starts_with(MARKER_PREFIX) => {
                out.push_str(&f(first));
                out.push_str(chars.as_str());
            }
            _ => out.push_str(value),
        }
    }
}

mod subst {
    //! Substitution pseudo-functions.

    use super::*;

    /// `{{safesubst: template name [| ...] }}`
    ///
    /// Substitution only happens when a page is saved, so at expansion time
    /// `safesubst` is a plain call to whatever follows it.
    pub fn safesubst(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(target) = arguments.eval(ex, 0)? {
            let text = ex.call(&target, arguments.arguments.raw(), arguments.arguments.scope())?;
            out.push_str(&text);
        }
        Ok(())
    }

    /// `{{subst: template name [| ...] }}`
    ///
    /// Since nothing here is ever saved, this emits the call as written, with
    /// its arguments expanded.
    pub fn subst(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        out.push_str("{{subst:");
        for index in 0..arguments.len() {
            if index != 0 {
                out.push('|');
            }
            if let Some(value) = arguments.eval(ex, index)? {
                out.push_str(&value);
            }
        }
        out.push_str("}}");
        Ok(())
    }
}

mod time {
    //! Date and time functions.
    //!
    //! `CURRENT…` variables are in UTC and `LOCAL…` variables are in the
    //! offset of the expander clock. Both read the same snapshot, so every
    //! variable in one expansion agrees.

    use super::*;

    /// `{{LOCALTIME}}` or `{{CURRENTTIME}}`
    pub fn clock_time(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let time = base_time(ex, arguments);
        write!(out, "{:02}:{:02}", time.hour(), time.minute())?;
        Ok(())
    }

    /// `{{LOCALDAY}}` or `{{CURRENTDAY}}`
    pub fn day(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{}", base_time(ex, arguments).day())?;
        Ok(())
    }

    /// `{{LOCALDAY2}}` or `{{CURRENTDAY2}}`
    pub fn day_lz(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{:02}", base_time(ex, arguments).day())?;
        Ok(())
    }

    /// `{{LOCALDAYNAME}}` or `{{CURRENTDAYNAME}}`
    pub fn day_name(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let weekday = base_time(ex, arguments).weekday();
        out.push_str(ex.names.weekdays[usize::from(weekday.number_days_from_sunday())]);
        Ok(())
    }

    /// `{{LOCALDOW}}` or `{{CURRENTDOW}}`
    pub fn day_of_week(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        write!(
            out,
            "{}",
            base_time(ex, arguments).weekday().number_days_from_sunday()
        )?;
        Ok(())
    }

    /// `{{LOCALHOUR}}` or `{{CURRENTHOUR}}`
    pub fn hour(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{:02}", base_time(ex, arguments).hour())?;
        Ok(())
    }

    /// `{{LOCALMONTH1}}` or `{{CURRENTMONTH1}}`
    pub fn month(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{}", u8::from(base_time(ex, arguments).month()))?;
        Ok(())
    }

    /// `{{LOCALMONTHABBREV}}` or `{{CURRENTMONTHABBREV}}`
    pub fn month_abbr(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let index = month_index(&base_time(ex, arguments));
        out.push_str(ex.names.months_abbr[index]);
        Ok(())
    }

    /// `{{LOCALMONTH}}` or `{{CURRENTMONTH}}`, also spelled `…MONTH2`
    pub fn month_lz(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{:02}", u8::from(base_time(ex, arguments).month()))?;
        Ok(())
    }

    /// `{{LOCALMONTHNAME}}` or `{{CURRENTMONTHNAME}}`
    pub fn month_name(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let index = month_index(&base_time(ex, arguments));
        out.push_str(ex.names.months[index]);
        Ok(())
    }

    /// `{{LOCALMONTHNAMEGEN}}` or `{{CURRENTMONTHNAMEGEN}}`
    pub fn month_name_gen(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let index = month_index(&base_time(ex, arguments));
        out.push_str(ex.names.months_genitive[index]);
        Ok(())
    }

    /// `{{#time: format [| time [| language code [| local ]]] }}` or
    /// `{{#timel: format [| time [| language code ]] }}`
    pub fn time(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let Some(format) = arguments.eval(ex, 0)?.map(trim) else {
            return Ok(());
        };
        let date = arguments.eval(ex, 1)?.map(trim).unwrap_or_default();
        let names = match arguments.eval(ex, 2)?.map(trim) {
            Some(code) if !code.is_empty() => DateNames::for_language(&code),
            _ => ex.names,
        };
        let local = arguments.callee == "#timel"
            || arguments
                .eval(ex, 3)?
                .map(trim)
                .is_some_and(|local| !local.is_empty() && local != "0");

        // 'Template:Date' sends garbage values to `#time` without an
        // `#iferror` guard to capture the errors.
        match DateTime::parse(&date, ex.base_time(local)).and_then(|date| date.format(&format, names)) {
            Ok(result) => out.push_str(&result),
            Err(err) => {
                log::debug!("#time: '{date}': {err}");
                out.push_str(INVALID_TIME);
            }
        }
        Ok(())
    }

    /// `{{LOCALTIMESTAMP}}` or `{{CURRENTTIMESTAMP}}`
    pub fn timestamp(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let time = base_time(ex, arguments);
        write!(
            out,
            "{:04}{:02}{:02}{:02}{:02}{:02}",
            time.year(),
            u8::from(time.month()),
            time.day(),
            time.hour(),
            time.minute(),
            time.second()
        )?;
        Ok(())
    }

    /// `{{LOCALWEEK}}` or `{{CURRENTWEEK}}`
    pub fn week(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{}", base_time(ex, arguments).iso_week())?;
        Ok(())
    }

    /// `{{LOCALYEAR}}` or `{{CURRENTYEAR}}`
    pub fn year(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        write!(out, "{}", base_time(ex, arguments).year())?;
        Ok(())
    }

    /// The time snapshot for the variable being expanded.
    fn base_time(ex: &Expander<'_>, arguments: &IndexedArgs<'_>) -> OffsetDateTime {
        ex.base_time(arguments.callee.starts_with("local"))
    }

    /// The zero-based index of the month.
    fn month_index(time: &OffsetDateTime) -> usize {
        usize::from(u8::from(time.month())) - 1
    }
}

mod title {
    //! Article title functions.

    use super::*;

    /// `{{#ifexist: title | consequent (exists) | alternate }}`
    pub fn if_exist(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        let exists = match arguments.eval(ex, 0)?.map(trim) {
            Some(title) if !title.is_empty() => ex.page_exists(&title)?,
            _ => false,
        };
        if let Some(value) = arguments.eval(ex, 1 + usize::from(!exists))?.map(trim) {
            out.push_str(&value);
        }

        Ok(())
    }

    /// `{{ns: namespace name or id }}` or `{{nse: namespace name or id }}`
    pub fn namespace_by_name_or_id(
        out: &mut String,
        ex: &mut Expander<'_>,
        arguments: &IndexedArgs<'_>,
    ) -> Result {
        if let Some(value) = arguments.eval(ex, 0)?.map(trim) {
            let name = if let Ok(id) = value.parse::<i32>() {
                ex.nshandler.get_nsname_by_number(id)
            } else {
                ex.nshandler.find_by_name(&value).map(|ns| ns.name.as_str())
            };
            if let Some(name) = name {
                if arguments.callee == "nse" {
                    out.push_str(&url_encode(name, UrlStyle::Wiki));
                } else {
                    out.push_str(name);
                }
            }
        }

        Ok(())
    }

    /// `{{localurl: title [| query string] }}`, `{{fullurl: … }}`, or
    /// `{{canonicalurl: … }}`, along with their HTML-escaped `…E` forms.
    pub fn url(out: &mut String, ex: &mut Expander<'_>, arguments: &IndexedArgs<'_>) -> Result {
        let Some(target) = arguments.eval(ex, 0)?.map(trim) else {
            return Ok(());
        };
        let query = arguments.eval(ex, 1)?.map(trim);
        let (kind, escape) = match arguments.callee {
            callee @ ("localurle" | "fullurle" | "canonicalurle") => {
                (&callee[..callee.len() - 1], true)
            }
            callee => (callee, false),
        };

        let mut url = local_url(ex, &target, query.as_deref().filter(|query| !query.is_empty()));
        let server = ex.siteinfo.server();
        if kind != "localurl" && url.starts_with('/') && !url.starts_with("//") {
            url.insert_str(0, server);
        }
        if kind == "canonicalurl" && url.starts_with("//") {
            url.insert_str(0, "https:");
        }

        if escape {
            write!(out, "{}", html_escape::encode_text(&url))?;
        } else {
            out.push_str(&url);
        }
        Ok(())
    }

    /// Builds the local URL of a page, or the URL of a page on another wiki
    /// if the title has an interwiki prefix.
    fn local_url(ex: &Expander<'_>, title: &str, query: Option<&str>) -> String {
        if let Some((prefix, rest)) = title.split_once(':')
            && ex.nshandler.find_by_name(prefix).is_none()
            && let Some(interwiki) = ex.siteinfo.interwiki(prefix)
        {
            let mut url = interwiki
                .url
                .replace("$1", &url_encode(rest.trim_ascii(), UrlStyle::Wiki));
            if let Some(query) = query {
                url.push(if url.contains('?') { '&' } else { '?' });
                url += query;
            }
            return url;
        }

        let title = url_encode(&ex.nshandler.get_fqname(title, Namespace::MAIN), UrlStyle::Wiki);
        if let Some(query) = query {
            format!("{}?title={title}&{query}", ex.siteinfo.script())
        } else {
            ex.siteinfo.article_path().replace("$1", &title)
        }
    }
}

/// Known parser functions and variables, by canonical name.
static PARSER_FUNCTIONS: phf::Map<&'static str, ParserFn> = phf::phf_map! {
    "!" => |out: &mut String, _, _| { out.write_char('|')?; Ok(()) },
    "=" => |out: &mut String, _, _| { out.write_char('=')?; Ok(()) },

    "#expr" => cond::expr,
    "#if" => cond::r#if,
    "#ifeq" => cond::if_eq,
    "#iferror" => cond::if_error,
    "#ifexpr" => cond::if_expr,
    "#switch" => cond::switch,

    "#tag" => ext::tag,
    "tag" => ext::tag,

    "articlepagename" => page::title_part,
    "articlepagenamee" => page::title_part,
    "articlespace" => page::title_part,
    "articlespacee" => page::title_part,
    "basepagename" => page::title_part,
    "basepagenamee" => page::title_part,
    "defaultsort" => page::set_page_var,
    "displaytitle" => page::set_page_var,
    "fullpagename" => page::title_part,
    "fullpagenamee" => page::title_part,
    "namespace" => page::title_part,
    "namespacee" => page::title_part,
    "namespacenumber" => page::title_part,
    "pagename" => page::title_part,
    "pagenamee" => page::title_part,
    "revisionid" => page::revision_id,
    "rootpagename" => page::title_part,
    "rootpagenamee" => page::title_part,
    "subjectpagename" => page::title_part,
    "subjectpagenamee" => page::title_part,
    "subjectspace" => page::title_part,
    "subjectspacee" => page::title_part,
    "subpagename" => page::title_part,
    "subpagenamee" => page::title_part,
    "talkpagename" => page::title_part,
    "talkpagenamee" => page::title_part,
    "talkspace" => page::title_part,
    "talkspacee" => page::title_part,

    "contentlanguage" => site::content_language,
    "scriptpath" => site::script_path,
    "server" => site::server,
    "servername" => site::server_name,
    "sitename" => site::site_name,

    "anchorencode" => string::anchor_encode,
    "formatnum" => string::format_number,
    "lc" => string::lc,
    "lcfirst" => string::lc_first,
    "padleft" => string::pad,
    "padright" => string::pad,
    "#rel2abs" => string::rel2abs,
    "#titleparts" => string::title_parts,
    "uc" => string::uc,
    "ucfirst" => string::uc_first,
    "urlencode" => string::url_encode,

    "safesubst" => subst::safesubst,
    "subst" => subst::subst,

    "currentday" => time::day,
    "currentday2" => time::day_lz,
    "currentdayname" => time::day_name,
    "currentdow" => time::day_of_week,
    "currenthour" => time::hour,
    "currentmonth" => time::month_lz,
    "currentmonth1" => time::month,
    "currentmonth2" => time::month_lz,
    "currentmonthabbrev" => time::month_abbr,
    "currentmonthname" => time::month_name,
    "currentmonthnamegen" => time::month_name_gen,
    "currenttime" => time::clock_time,
    "currenttimestamp" => time::timestamp,
    "currentweek" => time::week,
    "currentyear" => time::year,
    "localday" => time::day,
    "localday2" => time::day_lz,
    "localdayname" => time::day_name,
    "localdow" => time::day_of_week,
    "localhour" => time::hour,
    "localmonth" => time::month_lz,
    "localmonth1" => time::month,
    "localmonth2" => time::month_lz,
    "localmonthabbrev" => time::month_abbr,
    "localmonthname" => time::month_name,
    "localmonthnamegen" => time::month_name_gen,
    "localtime" => time::clock_time,
    "localtimestamp" => time::timestamp,
    "localweek" => time::week,
    "localyear" => time::year,
    "#time" => time::time,
    "#timel" => time::time,

    "canonicalurl" => title::url,
    "canonicalurle" => title::url,
    "fullurl" => title::url,
    "fullurle" => title::url,
    "#ifexist" => title::if_exist,
    "localurl" => title::url,
    "localurle" => title::url,
    "ns" => title::namespace_by_name_or_id,
    "nse" => title::namespace_by_name_or_id,
};

/// Magic words which are only variables, like `{{CURRENTYEAR}}`. These are
/// never called with a `:`.
static VARIABLES: phf::Set<&'static str> = phf::phf_set! {
    "!", "=",
    "contentlanguage", "revisionid", "scriptpath", "server", "servername",
    "sitename",
    "currentday", "currentday2", "currentdayname", "currentdow", "currenthour",
    "currentmonth", "currentmonth1", "currentmonth2", "currentmonthabbrev",
    "currentmonthname", "currentmonthnamegen", "currenttime",
    "currenttimestamp", "currentweek", "currentyear",
    "localday", "localday2", "localdayname", "localdow", "localhour",
    "localmonth", "localmonth1", "localmonth2", "localmonthabbrev",
    "localmonthname", "localmonthnamegen", "localtime", "localtimestamp",
    "localweek", "localyear",
};

/// Magic words which work both as variables and as functions, like
/// `{{PAGENAME}}` and `{{PAGENAME:Title}}`.
static OPTIONAL_ARGUMENT: phf::Set<&'static str> = phf::phf_set! {
    "articlepagename", "articlepagenamee", "articlespace", "articlespacee",
    "basepagename", "basepagenamee", "fullpagename", "fullpagenamee",
    "namespace", "namespacee", "namespacenumber", "pagename", "pagenamee",
    "rootpagename", "rootpagenamee", "subjectpagename", "subjectpagenamee",
    "subjectspace", "subjectspacee", "subpagename", "subpagenamee",
    "talkpagename", "talkpagenamee", "talkspace", "talkspacee",
};

/// Returns the parser function with the given canonical name.
pub(super) fn function(name: &str) -> Option<ParserFn> {
    if VARIABLES.contains(name) {
        None
    } else {
        PARSER_FUNCTIONS.get(name).copied()
    }
}

/// Returns the variable with the given canonical name.
pub(super) fn variable(name: &str) -> Option<ParserFn> {
    if VARIABLES.contains(name) || OPTIONAL_ARGUMENT.contains(name) {
        PARSER_FUNCTIONS.get(name).copied()
    } else {
        None
    }
}

/// Returns true if a `#if` condition counts as true: anything but
/// whitespace, ignoring the blacklist sentinel.
pub(super) fn is_truthy(cond: &str) -> bool {
    cond.split('\u{ebad}')
        .any(|part| !part.trim_ascii().is_empty())
}

/// Converts a `Result<T, E>` into a `Result<T, String>` where the error is a
/// MediaWiki error marker, to ignore errors like it’s 1995.
fn on_error_resume_next<T, E: fmt::Display>(value: Result<T, E>) -> Result<T, String> {
    value.map_err(|err| {
        format!(
            r#"<strong class="error">{}</strong>"#,
            html_escape::encode_text(&err.to_string())
        )
    })
}

/// Decodes HTML entities and trims ASCII whitespace from the value.
pub(super) fn decode_trim(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        // This ugliness seems to be necessary to maintain the original lifetime
        // and satisfy borrowck
        Cow::Borrowed(value) => match decode_html(value) {
            Cow::Borrowed(value) => Cow::Borrowed(value.trim_ascii()),
            Cow::Owned(value) => Cow::Owned(value.trim_ascii().to_string()),
        },
        Cow::Owned(value) => Cow::Owned(decode_html(&value).trim_ascii().to_string()),
    }
}

/// Trims ASCII whitespace from the value.
///
/// MediaWiki expands and trims the arguments of most parser functions before
/// calling them. Arguments here are lazy, so each function trims what it
/// uses.
pub(super) fn trim(value: Cow<'_, str>) -> Cow<'_, str> {
    match value {
        Cow::Borrowed(value) => Cow::Borrowed(value.trim_ascii()),
        Cow::Owned(value) => Cow::Owned(value.trim_ascii().to_string()),
    }
}
