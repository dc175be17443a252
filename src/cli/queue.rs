use tabled::Table;

use crate::{cli, error, info, success, types::QueueTableRow, utils};

/// Prints the durable queue in insertion order.
pub async fn list_queue() {
    let scrobbler = cli::open_scrobbler().await;
    let records = scrobbler.queue().await;

    if records.is_empty() {
        info!("Queue is empty.");
        return;
    }

    let table_rows: Vec<QueueTableRow> = records
        .into_iter()
        .map(|r| {
            let mut flags = Vec::new();
            if r.sent {
                flags.push("sent");
            }
            if r.error {
                flags.push("error");
            }
            QueueTableRow {
                id: r.id,
                listened_at: utils::format_epoch(r.timestamp),
                artist: r.metadata.artist,
                title: r.metadata.title,
                flags: flags.join(","),
            }
        })
        .collect();

    let table = Table::new(table_rows);
    println!("{}", table);
}

/// Drops all queued listens, including error-flagged ones.
pub async fn clear_queue() {
    let scrobbler = cli::open_scrobbler().await;
    let pending = scrobbler.pending().await;

    if pending == 0 {
        info!("Queue is already empty.");
        return;
    }

    if let Err(e) = scrobbler.clear_queue().await {
        error!("Failed to clear queue: {}", e);
    }
    success!("Dropped {} queued listens.", pending);
}
