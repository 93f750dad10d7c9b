//! SQL statements of the audit tables. The tables themselves are created
//! by the migrations in the workspace `migrations/` directory.

pub const INSERT_EVENT: &str = r"
INSERT INTO events (event_id, customer_id, event_type, timestamp, payload)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (event_id) DO NOTHING
";

pub const SELECT_EVENTS_BY_CUSTOMER: &str = r"
SELECT event_id, customer_id, event_type, timestamp, payload
FROM events
WHERE customer_id = $1
ORDER BY timestamp DESC
LIMIT $2
";

pub const COUNT_EVENTS: &str = "SELECT COUNT(*) AS cnt FROM events";

pub const COUNT_EVENTS_BY_TYPE: &str = r"
SELECT event_type, COUNT(*) AS cnt
FROM events
GROUP BY event_type
ORDER BY cnt DESC, event_type
";

pub const INSERT_ACTION: &str = r"
INSERT INTO actions (action_id, customer_id, action_type, message, channel, campaign_id, sent_at)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (action_id) DO NOTHING
";

pub const SELECT_RECENT_ACTIONS: &str = r"
SELECT action_id, customer_id, action_type, message, channel, campaign_id, sent_at
FROM actions
ORDER BY sent_at DESC
LIMIT $1
";

pub const COUNT_ACTIONS: &str = "SELECT COUNT(*) AS cnt FROM actions";
