use uuid::Uuid;

use super::cleanup_test_tickets;
use super::create_test_database;
use crate::models::ImportReply;
use crate::models::ImportTicket;
use crate::Result;
use crate::SupportRagError;

fn reply(owner: &str, content: &str) -> ImportReply {
    ImportReply {
        content: content.to_string(),
        owner: owner.to_string(),
    }
}

fn ticket(original_id: i64, title: &str, category: Option<&str>) -> ImportTicket {
    ImportTicket {
        id: original_id,
        title: title.to_string(),
        description: None,
        category: category.map(str::to_string),
        replies: vec![
            reply("customer", "第一条"),
            reply("agent", "第二条"),
        ],
    }
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_import_and_title_substring_search() -> Result<()> {
    let database = create_test_database().await?;
    let test_id = 99901i64;
    cleanup_test_tickets(&database, &[test_id]).await?;

    let report = database
        .import_tickets(&[ticket(test_id, "测试发货延迟专用标题", Some("物流"))], 100)
        .await?;
    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 0);

    // A query substring equal to the title must find the ticket
    let found = database
        .search_tickets("测试发货延迟专用标题", None, 10)
        .await?;
    assert!(found.iter().any(|t| t.original_id == test_id));

    // Case-insensitive match on Latin text
    cleanup_test_tickets(&database, &[test_id]).await?;
    database
        .import_tickets(&[ticket(test_id, "Refund Request FOO", None)], 100)
        .await?;
    let found = database.search_tickets("refund request", None, 10).await?;
    assert!(found.iter().any(|t| t.original_id == test_id));

    cleanup_test_tickets(&database, &[test_id]).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_category_filter_and_ordering() -> Result<()> {
    let database = create_test_database().await?;
    let ids = [99911i64, 99912, 99913];
    cleanup_test_tickets(&database, &ids).await?;

    database
        .import_tickets(
            &[
                ticket(99911, "排序测试甲", Some("物流")),
                ticket(99913, "排序测试乙", Some("售后")),
                ticket(99912, "排序测试丙", Some("物流")),
            ],
            100,
        )
        .await?;

    // Newest original id first
    let found = database.search_tickets("排序测试", None, 10).await?;
    let found_ids: Vec<i64> = found.iter().map(|t| t.original_id).collect();
    assert_eq!(found_ids, vec![99913, 99912, 99911]);

    // Category narrows the result
    let found = database.search_tickets("排序测试", Some("物流"), 10).await?;
    let found_ids: Vec<i64> = found.iter().map(|t| t.original_id).collect();
    assert_eq!(found_ids, vec![99912, 99911]);

    cleanup_test_tickets(&database, &ids).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_reply_ordering_follows_input_order() -> Result<()> {
    let database = create_test_database().await?;
    let test_id = 99921i64;
    cleanup_test_tickets(&database, &[test_id]).await?;

    let mut record = ticket(test_id, "回复顺序测试", None);
    record.replies = vec![
        reply("customer", "A"),
        reply("agent", "B"),
        reply("customer", "C"),
    ];
    database.import_tickets(&[record], 100).await?;

    let found = database.search_tickets("回复顺序测试", None, 1).await?;
    let with_replies = database.get_ticket_with_replies(found[0].id).await?;

    let contents: Vec<&str> = with_replies.replies.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["A", "B", "C"]);
    let orders: Vec<i32> = with_replies.replies.iter().map(|r| r.sequence_order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    cleanup_test_tickets(&database, &[test_id]).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_get_ticket_with_replies_not_found() -> Result<()> {
    let database = create_test_database().await?;

    let missing = Uuid::new_v4();
    let result = database.get_ticket_with_replies(missing).await;
    assert!(matches!(result, Err(SupportRagError::TicketNotFound(id)) if id == missing));

    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_relevant_search_matches_keyword_not_others() -> Result<()> {
    let database = create_test_database().await?;
    let ids = [99931i64, 99932];
    cleanup_test_tickets(&database, &ids).await?;

    database
        .import_tickets(
            &[
                ticket(99931, "发货延迟问题", Some("物流")),
                ticket(99932, "退款流程", Some("售后")),
            ],
            100,
        )
        .await?;

    let found = database.search_relevant_tickets("发货", 10, 3).await?;
    assert!(found.iter().any(|t| t.ticket.original_id == 99931));
    assert!(!found.iter().any(|t| t.ticket.original_id == 99932));

    // Replies come back inline, ordered
    let hit = found
        .iter()
        .find(|t| t.ticket.original_id == 99931)
        .expect("ticket present");
    assert_eq!(hit.replies.len(), 2);
    assert!(hit.replies[0].sequence_order < hit.replies[1].sequence_order);

    cleanup_test_tickets(&database, &ids).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_relevant_search_zero_keywords_is_empty() -> Result<()> {
    let database = create_test_database().await?;

    // Single-character tokens are discarded, so no store query is issued
    let found = database.search_relevant_tickets("a 货 b", 10, 3).await?;
    assert!(found.is_empty());

    let found = database.search_relevant_tickets("", 10, 3).await?;
    assert!(found.is_empty());

    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_import_skips_bad_records_and_keeps_good_ones() -> Result<()> {
    let database = create_test_database().await?;
    let ids = [99941i64, 99942];
    cleanup_test_tickets(&database, &ids).await?;

    let mut bad = ticket(99942, "坏记录", None);
    bad.replies = vec![reply("bot", "无效角色")];

    let report = database
        .import_tickets(&[ticket(99941, "好记录", None), bad], 100)
        .await?;

    assert_eq!(report.success_count, 1);
    assert_eq!(report.error_count, 1);
    assert_eq!(report.failures[0].original_id, 99942);

    // The failed ticket left no rows behind
    let found = database.search_tickets("坏记录", None, 10).await?;
    assert!(found.is_empty());
    let found = database.search_tickets("好记录", None, 10).await?;
    assert_eq!(found.len(), 1);

    cleanup_test_tickets(&database, &ids).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - destroys all data, dedicated test database only"]
async fn test_clear_between_imports_is_idempotent() -> Result<()> {
    let database = create_test_database().await?;
    let test_id = 99961i64;

    let record = ticket(test_id, "清库重导测试", Some("物流"));

    database.import_tickets(std::slice::from_ref(&record), 100).await?;
    database.clear_all_data().await?;
    database.import_tickets(std::slice::from_ref(&record), 100).await?;

    // Same rows by content after clear + reimport (ids are regenerated)
    let found = database.search_tickets("清库重导测试", None, 10).await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].original_id, test_id);
    assert_eq!(found[0].category.as_deref(), Some("物流"));

    let with_replies = database.get_ticket_with_replies(found[0].id).await?;
    assert_eq!(with_replies.replies.len(), 2);

    cleanup_test_tickets(&database, &[test_id]).await?;
    Ok(())
}

#[tokio::test]
#[ignore = "Requires database access - run against a dedicated test database"]
async fn test_reimport_without_clear_keeps_duplicates() -> Result<()> {
    let database = create_test_database().await?;
    let test_id = 99951i64;
    cleanup_test_tickets(&database, &[test_id]).await?;

    let record = ticket(test_id, "重复导入测试", None);
    database.import_tickets(std::slice::from_ref(&record), 100).await?;
    database.import_tickets(std::slice::from_ref(&record), 100).await?;

    // No silent dedupe: both copies are visible
    let found = database.search_tickets("重复导入测试", None, 10).await?;
    assert_eq!(found.len(), 2);

    cleanup_test_tickets(&database, &[test_id]).await?;
    Ok(())
}
