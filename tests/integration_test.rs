//! End-to-end tests that exercise the import format, document projection,
//! and context rendering without a live database.

use std::io::Write;

use chrono::Utc;
use uuid::Uuid;

use supportrag::models::parse_import_records;
use supportrag::models::Reply;
use supportrag::models::Ticket;
use supportrag::models::TicketWithReplies;
use supportrag::rag::CaseMatch;
use supportrag::rag::ContextAssembler;
use supportrag::text::extract_keywords;
use supportrag::text::strip_html;
use supportrag::vector::build_document_text;

const SAMPLE_IMPORT: &str = r#"[
    {
        "id": 101,
        "title": "发货延迟问题",
        "description": "<p>下单一周还没有发货</p>",
        "category": "物流",
        "replies": [
            {"content": "我的订单怎么还没发货？", "owner": "customer"},
            {"content": "已经为您催促仓库，<b>预计明天发出</b>。", "owner": "agent"}
        ]
    },
    {
        "id": 102,
        "title": "退款流程",
        "category": "售后",
        "replies": [
            {"content": "怎么申请退款？", "owner": "customer"},
            {"content": "在订单页面点击退款即可。", "owner": "agent"}
        ]
    }
]"#;

#[test]
fn test_import_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE_IMPORT.as_bytes()).unwrap();

    let json = std::fs::read_to_string(file.path()).unwrap();
    let (tickets, failures) = parse_import_records(&json).unwrap();

    assert_eq!(tickets.len(), 2);
    assert!(failures.is_empty());
    assert_eq!(tickets[0].id, 101);
    assert_eq!(tickets[1].description, None);
}

#[test]
fn test_document_projection_from_import_records() {
    let (tickets, _) = parse_import_records(SAMPLE_IMPORT).unwrap();

    let text = build_document_text(&tickets[0]).unwrap();
    assert!(text.starts_with("分类: 物流\n问题: 发货延迟问题\n"));
    assert!(text.contains("描述: 下单一周还没有发货\n"));
    assert!(text.contains("用户: 我的订单怎么还没发货？"));
    // Markup inside replies is flattened away
    assert!(text.contains("客服: 已经为您催促仓库，预计明天发出。"));
    assert!(!text.contains('<'));
}

#[test]
fn test_context_rendering_preserves_retrieval_order() {
    let (tickets, _) = parse_import_records(SAMPLE_IMPORT).unwrap();

    // Simulate retrieval returning ticket 102 ranked above 101
    let matches: Vec<CaseMatch> = [&tickets[1], &tickets[0]]
        .into_iter()
        .map(|record| {
            let ticket_id = Uuid::new_v4();
            CaseMatch::Ticket(TicketWithReplies {
                ticket: Ticket {
                    id: ticket_id,
                    original_id: record.id,
                    title: record.title.clone(),
                    description: record.description.clone(),
                    category: record.category.clone(),
                    created_at: Utc::now(),
                },
                replies: record
                    .replies
                    .iter()
                    .enumerate()
                    .map(|(idx, reply)| Reply {
                        id: Uuid::new_v4(),
                        ticket_id,
                        owner: reply.owner.clone(),
                        content: reply.content.clone(),
                        sequence_order: idx as i32,
                        created_at: Utc::now(),
                    })
                    .collect(),
            })
        })
        .collect();

    let context = ContextAssembler::new().format_as_context(&matches);

    assert!(context.starts_with("以下是相关的历史客服案例供参考:\n\n"));
    let refund = context.find("退款流程").unwrap();
    let shipping = context.find("发货延迟问题").unwrap();
    assert!(refund < shipping, "rank order must survive rendering");
    assert!(context.contains("【案例1】"));
    assert!(context.contains("【案例2】"));
    assert!(!context.contains("【案例3】"));
}

#[test]
fn test_shipment_query_keywords_select_the_right_ticket() {
    // The retrieval predicate is "title or description contains any
    // keyword"; with the query splitting into a single token, only the
    // shipment ticket can match.
    let keywords = extract_keywords("发货", 10);
    assert_eq!(keywords, vec!["发货"]);

    assert!("发货延迟问题".contains(&keywords[0]));
    assert!(!"退款流程".contains(&keywords[0]));
}

#[test]
fn test_normalizer_round_trip() {
    assert_eq!(
        strip_html("<p>Hello<br/>World</p>&nbsp;test"),
        "Hello\nWorld test"
    );
}
