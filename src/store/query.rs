use std::sync::LazyLock;

use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::config;
use crate::crypto::{FieldCipher, TokenSource};
use crate::error::VaultResult;
use crate::store::db::{RawRow, ROW_COLUMNS};
use crate::store::{Mailstore, MessagePage};
use crate::tokenize::{is_full_email, tokenize};

/// Caller-facing filter inputs for [`Mailstore::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Approximate recipient scoping via the recipient token source.
    pub recipient_username: Option<String>,
    pub is_read: Option<bool>,
    /// Inclusive arrival_time lower bound (ISO-8601, compared as text).
    pub date_from: Option<String>,
    /// Inclusive arrival_time upper bound.
    pub date_to: Option<String>,
    /// Free-text search across all four token sources.
    pub search: Option<String>,
    /// Field-scoped expression: `;`-separated `field:value`, `is_read:X`,
    /// or bare-text clauses, OR-combined.
    pub advanced: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    ArrivalTime,
    IsRead,
}

impl SortKey {
    fn as_sql(self) -> &'static str {
        match self {
            SortKey::ArrivalTime => "arrival_time",
            SortKey::IsRead => "is_read",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

impl SortDir {
    fn as_sql(self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Recognized `field:` aliases in advanced expressions, checked in order.
const FIELD_ALIASES: &[(&str, TokenSource)] = &[
    ("from", TokenSource::Sender),
    ("to", TokenSource::Recipient),
    ("sender", TokenSource::Sender),
    ("recipient", TokenSource::Recipient),
    ("subject", TokenSource::Subject),
    ("body", TokenSource::Body),
];

/// Token hashes derived from an advanced expression, plus any `is_read:`
/// clause pulled out of it (which overrides the caller-supplied filter).
struct SearchPlan {
    hashes: Vec<String>,
    is_read_override: Option<bool>,
}

fn plan_advanced(cipher: &FieldCipher, advanced: &str) -> SearchPlan {
    let mut hashes = Vec::new();
    let mut is_read_override = None;

    for part in advanced.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let lower = part.to_lowercase();

        if let Some(value) = lower.strip_prefix("is_read:") {
            match value.trim() {
                "true" | "1" | "yes" => is_read_override = Some(true),
                "false" | "0" | "no" => is_read_override = Some(false),
                _ => {}
            }
            continue;
        }

        let mut matched = false;
        for &(alias, source) in FIELD_ALIASES {
            let Some(rest) = field_value(part, &lower, alias) else {
                continue;
            };
            let value = strip_quotes(rest.trim());

            if is_full_email(value)
                && matches!(source, TokenSource::Sender | TokenSource::Recipient)
            {
                // Exact email fast path: the full address is always a token,
                // so one hash suffices and avoids matching unrelated mail
                // that merely shares the domain.
                hashes.push(cipher.token_hash(source, &value.trim().to_lowercase()));
            } else {
                for token in tokenize(value) {
                    hashes.push(cipher.token_hash(source, &token));
                }
            }
            matched = true;
            break;
        }

        if !matched {
            push_all_sources(cipher, part, &mut hashes);
        }
    }

    SearchPlan {
        hashes,
        is_read_override,
    }
}

/// If `part` starts with `alias:` (case-insensitive), return the value
/// slice from the original (case-preserved) text. The matched prefix is
/// pure ASCII, so byte offsets agree between `part` and its lowercase form.
fn field_value<'a>(part: &'a str, lower: &str, alias: &str) -> Option<&'a str> {
    let prefix_len = alias.len() + 1;
    if lower.len() >= prefix_len
        && lower.starts_with(alias)
        && lower.as_bytes()[alias.len()] == b':'
    {
        Some(&part[prefix_len..])
    } else {
        None
    }
}

fn strip_quotes(v: &str) -> &str {
    let b = v.as_bytes();
    if b.len() >= 2
        && ((b[0] == b'"' && b[b.len() - 1] == b'"')
            || (b[0] == b'\'' && b[b.len() - 1] == b'\''))
    {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

fn push_all_sources(cipher: &FieldCipher, text: &str, hashes: &mut Vec<String>) {
    for token in tokenize(text) {
        for source in TokenSource::ALL {
            hashes.push(cipher.token_hash(source, &token));
        }
    }
}

/// OR-lookup over the emitted hashes: any token row matching any hash puts
/// its message into the candidate set. Field scoping rides on the
/// source-tagged hashing, not on an extra predicate. The result is a
/// superset of true matches (64-bit hashes can collide); materialization
/// decrypts the real rows.
fn candidate_ids_for(conn: &Connection, hashes: &[String]) -> VaultResult<Vec<String>> {
    if hashes.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; hashes.len()].join(",");
    let sql =
        format!("SELECT DISTINCT message_id FROM tokens WHERE token_hash IN ({placeholders})");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(hashes.iter()), |r| {
        r.get::<_, String>(0)
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn empty_page(page: u64, page_size: u64) -> MessagePage {
    MessagePage {
        items: vec![],
        total_items: 0,
        total_pages: 0,
        current_page: page,
        page_size,
    }
}

impl Mailstore {
    /// Paginated, filtered, sorted listing.
    ///
    /// Search text (simple or advanced) resolves to a candidate id set via
    /// the token index; `is_read` and the date bounds apply as plaintext
    /// predicates; rows that fail authentication are logged and skipped.
    pub fn query(
        &self,
        filter: &QueryFilter,
        page: u64,
        page_size: u64,
        sort_by: SortKey,
        sort_order: SortDir,
    ) -> VaultResult<MessagePage> {
        let page = page.max(1);
        let page_size = page_size.max(1);

        let conn = self.conn.lock().unwrap();

        let mut is_read = filter.is_read;
        let mut candidate_ids: Option<Vec<String>> = None;

        if let Some(advanced) = filter.advanced.as_deref() {
            let plan = plan_advanced(&self.cipher, advanced);
            if plan.is_read_override.is_some() {
                is_read = plan.is_read_override;
            }
            if !plan.hashes.is_empty() {
                let ids = candidate_ids_for(&conn, &plan.hashes)?;
                if ids.is_empty() {
                    return Ok(empty_page(page, page_size));
                }
                candidate_ids = Some(ids);
            } else if plan.is_read_override.is_none() {
                // Nothing tokenizable and no is_read clause either.
                return Ok(empty_page(page, page_size));
            }
            // Only an is_read clause: the candidate set is all messages.
        } else if let Some(search) = filter.search.as_deref() {
            let ids = self.simple_search_ids(&conn, search)?;
            if ids.is_empty() {
                return Ok(empty_page(page, page_size));
            }
            candidate_ids = Some(ids);
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut bind: Vec<Value> = Vec::new();

        if let Some(ids) = &candidate_ids {
            let placeholders = vec!["?"; ids.len()].join(",");
            clauses.push(format!("id IN ({placeholders})"));
            bind.extend(ids.iter().map(|s| Value::from(s.clone())));
        }
        if let Some(username) = filter.recipient_username.as_deref() {
            clauses.push(
                "EXISTS (SELECT 1 FROM tokens t \
                 WHERE t.message_id = messages.id AND t.token_hash = ?)"
                    .to_string(),
            );
            bind.push(Value::from(self.recipient_scope_hash(username)));
        }
        if let Some(read) = is_read {
            clauses.push("is_read = ?".to_string());
            bind.push(Value::from(read as i64));
        }
        if let Some(from) = filter.date_from.as_deref() {
            clauses.push("arrival_time >= ?".to_string());
            bind.push(Value::from(from.to_string()));
        }
        if let Some(to) = filter.date_to.as_deref() {
            clauses.push("arrival_time <= ?".to_string());
            bind.push(Value::from(to.to_string()));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let count_sql = format!("SELECT COUNT(*) FROM messages {where_sql}");
        let total_items: i64 =
            conn.query_row(&count_sql, rusqlite::params_from_iter(bind.iter()), |r| {
                r.get(0)
            })?;
        let total_items = total_items as u64;
        let total_pages = total_items.div_ceil(page_size);

        let select_sql = format!(
            "SELECT {ROW_COLUMNS} FROM messages {where_sql} \
             ORDER BY {} {} LIMIT ? OFFSET ?",
            sort_by.as_sql(),
            sort_order.as_sql()
        );
        bind.push(Value::from(page_size as i64));
        bind.push(Value::from(((page - 1) * page_size) as i64));

        let mut stmt = conn.prepare(&select_sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(bind.iter()), RawRow::from_row)?;

        let mut items = Vec::new();
        for raw in rows {
            let raw = raw?;
            let id = raw.id.clone();
            match self.decrypt_row(raw, false) {
                Ok(msg) => items.push(msg),
                Err(e) => log::error!("Failed to decrypt message {id}: {e}"),
            }
        }

        Ok(MessagePage {
            items,
            total_items,
            total_pages,
            current_page: page,
            page_size,
        })
    }

    /// Simple (free-text) search. A query that is itself a full email
    /// address gets an exact-match pass over the sender/recipient sources
    /// first; when that finds nothing, the whole-address token is tried
    /// against every source (the address may sit inside a subject or body).
    /// An address query never degrades into its word fragments: searching
    /// for `alice@other.com` must not surface every alice.
    fn simple_search_ids(&self, conn: &Connection, query: &str) -> VaultResult<Vec<String>> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(vec![]);
        }

        if is_full_email(query) {
            let exact = query.trim().to_lowercase();
            let exact_hashes = vec![
                self.cipher.token_hash(TokenSource::Sender, &exact),
                self.cipher.token_hash(TokenSource::Recipient, &exact),
            ];
            let ids = candidate_ids_for(conn, &exact_hashes)?;
            if !ids.is_empty() {
                return Ok(ids);
            }
            let anywhere: Vec<String> = TokenSource::ALL
                .iter()
                .map(|&source| self.cipher.token_hash(source, &exact))
                .collect();
            return candidate_ids_for(conn, &anywhere);
        }

        let mut hashes = Vec::with_capacity(tokens.len() * TokenSource::ALL.len());
        for token in &tokens {
            for source in TokenSource::ALL {
                hashes.push(self.cipher.token_hash(source, token));
            }
        }
        candidate_ids_for(conn, &hashes)
    }
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip HTML-like tags, collapse whitespace, truncate to 100 chars.
pub(crate) fn body_snippet(body: &str) -> String {
    let stripped = TAG_RE.replace_all(body, "");
    let collapsed = WS_RE.replace_all(&stripped, " ");
    let clean = collapsed.trim();

    let mut snippet: String = clean.chars().take(config::store::SNIPPET_MAX_CHARS).collect();
    if clean.chars().count() > config::store::SNIPPET_MAX_CHARS {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::tests::open_test_store;
    use crate::store::Mailstore;

    fn insert(
        store: &Mailstore,
        sender: &str,
        recipient: &str,
        subject: &str,
        body: &str,
        arrival: &str,
    ) -> String {
        store
            .insert(sender, recipient, subject, body, arrival, &[])
            .unwrap()
    }

    fn search(store: &Mailstore, q: &str) -> MessagePage {
        let filter = QueryFilter {
            search: Some(q.to_string()),
            ..Default::default()
        };
        store
            .query(&filter, 1, 20, SortKey::default(), SortDir::default())
            .unwrap()
    }

    fn advanced(store: &Mailstore, q: &str) -> MessagePage {
        let filter = QueryFilter {
            advanced: Some(q.to_string()),
            ..Default::default()
        };
        store
            .query(&filter, 1, 20, SortKey::default(), SortDir::default())
            .unwrap()
    }

    #[test]
    fn test_exact_email_search() {
        let (_dir, store) = open_test_store(u64::MAX);
        let id = insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "Hi",
            "Meet at 5",
            "2026-08-01T10:00:00.000Z",
        );

        let hit = search(&store, "alice@example.com");
        assert_eq!(hit.total_items, 1);
        assert_eq!(hit.items[0].id, id);

        let miss = search(&store, "alice@other.com");
        assert_eq!(miss.total_items, 0);
        assert!(miss.items.is_empty());
    }

    #[test]
    fn test_email_search_finds_address_in_body() {
        let (_dir, store) = open_test_store(u64::MAX);
        let id = insert(
            &store,
            "noreply@service.io",
            "bob@example.com",
            "intro",
            "please contact carol@partners.net for details",
            "2026-08-01T10:00:00.000Z",
        );

        // Not a sender or recipient, but the whole address is a body token.
        let page = search(&store, "carol@partners.net");
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].id, id);

        // An address query never degrades into fragments: "carol" alone
        // would match, the unknown address must not.
        assert_eq!(search(&store, "dave@partners.net").total_items, 0);
        assert_eq!(search(&store, "carol").total_items, 1);
    }

    #[test]
    fn test_field_scoped_advanced() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "bob@x.io",
            "team@example.com",
            "budget Q3",
            "see attachment",
            "2026-08-01T10:00:00.000Z",
        );

        assert_eq!(advanced(&store, "subject:budget").total_items, 1);
        // Same word, different source tag: no hit.
        assert_eq!(advanced(&store, "body:budget").total_items, 0);
    }

    #[test]
    fn test_bigram_phrase_search() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "report",
            "quarterly revenue growth forecast",
            "2026-08-01T10:00:00.000Z",
        );

        assert_eq!(search(&store, "revenue growth").total_items, 1);
        assert_eq!(search(&store, "shrinking margins").total_items, 0);
    }

    #[test]
    fn test_simple_search_recall() {
        let (_dir, store) = open_test_store(u64::MAX);
        let id = insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "project kickoff",
            "the deadline moved to friday",
            "2026-08-01T10:00:00.000Z",
        );

        // Any token drawn from any indexed field finds the message.
        for q in ["kickoff", "deadline", "friday", "alice", "example.com"] {
            let page = search(&store, q);
            assert_eq!(page.total_items, 1, "query '{q}' missed");
            assert_eq!(page.items[0].id, id);
        }
    }

    #[test]
    fn test_advanced_aliases_and_quotes() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "budget Q3",
            "numbers inside",
            "2026-08-01T10:00:00.000Z",
        );

        assert_eq!(advanced(&store, "from:alice@example.com").total_items, 1);
        assert_eq!(advanced(&store, "to:bob@example.com").total_items, 1);
        assert_eq!(advanced(&store, "sender:alice").total_items, 1);
        assert_eq!(advanced(&store, "subject:\"budget\"").total_items, 1);
        assert_eq!(advanced(&store, "subject:'budget'").total_items, 1);
        assert_eq!(advanced(&store, "FROM:alice@example.com").total_items, 1);
        assert_eq!(advanced(&store, "from:carol@example.com").total_items, 0);
    }

    #[test]
    fn test_advanced_clauses_are_union() {
        let (_dir, store) = open_test_store(u64::MAX);
        let a = insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "budget",
            "first",
            "2026-08-01T10:00:00.000Z",
        );
        let b = insert(
            &store,
            "carol@example.com",
            "bob@example.com",
            "vacation",
            "second",
            "2026-08-01T10:00:01.000Z",
        );

        let page = advanced(&store, "subject:budget; subject:vacation");
        assert_eq!(page.total_items, 2);
        let ids: Vec<_> = page.items.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&a.as_str()));
        assert!(ids.contains(&b.as_str()));
    }

    #[test]
    fn test_advanced_is_read_override() {
        let (_dir, store) = open_test_store(u64::MAX);
        let a = insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "budget one",
            "body",
            "2026-08-01T10:00:00.000Z",
        );
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "budget two",
            "body",
            "2026-08-01T10:00:01.000Z",
        );
        store.mark_read(&a, None, true).unwrap();

        let read = advanced(&store, "subject:budget; is_read:true");
        assert_eq!(read.total_items, 1);
        assert_eq!(read.items[0].id, a);

        let unread = advanced(&store, "subject:budget; is_read:no");
        assert_eq!(unread.total_items, 1);
        assert_ne!(unread.items[0].id, a);

        // The advanced clause overrides a conflicting caller filter.
        let filter = QueryFilter {
            advanced: Some("subject:budget; is_read:true".to_string()),
            is_read: Some(false),
            ..Default::default()
        };
        let page = store
            .query(&filter, 1, 20, SortKey::default(), SortDir::default())
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].id, a);
    }

    #[test]
    fn test_advanced_only_is_read_scans_all() {
        let (_dir, store) = open_test_store(u64::MAX);
        let a = insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "one",
            "body",
            "2026-08-01T10:00:00.000Z",
        );
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "two",
            "body",
            "2026-08-01T10:00:01.000Z",
        );
        store.mark_read(&a, None, true).unwrap();

        let page = advanced(&store, "is_read:false");
        assert_eq!(page.total_items, 1);
        assert_ne!(page.items[0].id, a);
    }

    #[test]
    fn test_empty_tokenization_is_empty_page() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "one",
            "body",
            "2026-08-01T10:00:00.000Z",
        );

        let page = search(&store, "!! ?? ..");
        assert_eq!(page.total_items, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());

        assert_eq!(advanced(&store, "?!").total_items, 0);
    }

    #[test]
    fn test_no_filters_lists_everything() {
        let (_dir, store) = open_test_store(u64::MAX);
        for i in 0..3 {
            insert(
                &store,
                "alice@example.com",
                "bob@example.com",
                &format!("msg {i}"),
                "body",
                &format!("2026-08-01T10:00:0{i}.000Z"),
            );
        }
        let page = store
            .query(
                &QueryFilter::default(),
                1,
                20,
                SortKey::default(),
                SortDir::default(),
            )
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert!(page.items[0].body.is_none());
        assert!(page.items[0].body_snippet.is_some());
    }

    #[test]
    fn test_sort_newest_first() {
        let (_dir, store) = open_test_store(u64::MAX);
        let m1 = insert(
            &store,
            "a@example.com",
            "b@example.com",
            "first",
            "body",
            "2026-08-01T10:00:00.000Z",
        );
        let m2 = insert(
            &store,
            "a@example.com",
            "b@example.com",
            "second",
            "body",
            "2026-08-01T10:00:01.000Z",
        );
        let m3 = insert(
            &store,
            "a@example.com",
            "b@example.com",
            "third",
            "body",
            "2026-08-01T10:00:02.000Z",
        );

        let page = store
            .query(
                &QueryFilter::default(),
                1,
                20,
                SortKey::ArrivalTime,
                SortDir::Desc,
            )
            .unwrap();
        let ids: Vec<_> = page.items.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![m3.clone(), m2.clone(), m1.clone()]);

        let asc = store
            .query(
                &QueryFilter::default(),
                1,
                20,
                SortKey::ArrivalTime,
                SortDir::Asc,
            )
            .unwrap();
        let ids: Vec<_> = asc.items.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![m1, m2, m3]);
    }

    #[test]
    fn test_pagination_and_clamping() {
        let (_dir, store) = open_test_store(u64::MAX);
        for i in 0..5 {
            insert(
                &store,
                "a@example.com",
                "b@example.com",
                &format!("msg {i}"),
                "body",
                &format!("2026-08-01T10:00:0{i}.000Z"),
            );
        }

        let p1 = store
            .query(
                &QueryFilter::default(),
                1,
                2,
                SortKey::default(),
                SortDir::default(),
            )
            .unwrap();
        assert_eq!(p1.total_items, 5);
        assert_eq!(p1.total_pages, 3);
        assert_eq!(p1.items.len(), 2);
        assert_eq!(p1.current_page, 1);
        assert_eq!(p1.page_size, 2);

        let p3 = store
            .query(
                &QueryFilter::default(),
                3,
                2,
                SortKey::default(),
                SortDir::default(),
            )
            .unwrap();
        assert_eq!(p3.items.len(), 1);

        // page 0 and page_size 0 clamp to 1.
        let clamped = store
            .query(
                &QueryFilter::default(),
                0,
                0,
                SortKey::default(),
                SortDir::default(),
            )
            .unwrap();
        assert_eq!(clamped.current_page, 1);
        assert_eq!(clamped.page_size, 1);
        assert_eq!(clamped.items.len(), 1);
        assert_eq!(clamped.total_pages, 5);
    }

    #[test]
    fn test_recipient_username_scoping() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "alice@example.com",
            "bob@example.com",
            "for bob",
            "body",
            "2026-08-01T10:00:00.000Z",
        );
        insert(
            &store,
            "alice@example.com",
            "carol@example.com",
            "for carol",
            "body",
            "2026-08-01T10:00:01.000Z",
        );

        let filter = QueryFilter {
            recipient_username: Some("bob".to_string()),
            ..Default::default()
        };
        let page = store
            .query(&filter, 1, 20, SortKey::default(), SortDir::default())
            .unwrap();
        assert_eq!(page.total_items, 1);
        assert_eq!(page.items[0].subject, "for bob");
    }

    #[test]
    fn test_date_range_filter() {
        let (_dir, store) = open_test_store(u64::MAX);
        for i in 0..4 {
            insert(
                &store,
                "a@example.com",
                "b@example.com",
                &format!("msg {i}"),
                "body",
                &format!("2026-08-01T10:00:0{i}.000Z"),
            );
        }

        let filter = QueryFilter {
            date_from: Some("2026-08-01T10:00:01.000Z".to_string()),
            date_to: Some("2026-08-01T10:00:02.000Z".to_string()),
            ..Default::default()
        };
        let page = store
            .query(&filter, 1, 20, SortKey::default(), SortDir::default())
            .unwrap();
        assert_eq!(page.total_items, 2);
    }

    #[test]
    fn test_snippet_strips_html_and_truncates() {
        let (_dir, store) = open_test_store(u64::MAX);
        insert(
            &store,
            "a@example.com",
            "b@example.com",
            "html",
            "<html><body><p>Hello   there</p> <br>General Kenobi</body></html>",
            "2026-08-01T10:00:00.000Z",
        );
        let page = store
            .query(
                &QueryFilter::default(),
                1,
                20,
                SortKey::default(),
                SortDir::default(),
            )
            .unwrap();
        assert_eq!(
            page.items[0].body_snippet.as_deref(),
            Some("Hello there General Kenobi")
        );

        assert_eq!(body_snippet(""), "");
        let long = "word ".repeat(50);
        let snip = body_snippet(&long);
        assert!(snip.ends_with("..."));
        assert_eq!(snip.chars().count(), 103);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("'hello'"), "hello");
        assert_eq!(strip_quotes("\"hello'"), "\"hello'");
        assert_eq!(strip_quotes("plain"), "plain");
        assert_eq!(strip_quotes("\""), "\"");
    }
}
