//! Prompt construction for the four generation kinds
//!
//! Source body text is truncated to a bounded prefix to cap prompt size; an
//! absent body falls back to the title so every prompt has some content.

/// Maximum number of characters of source body included in a prompt
pub const BODY_PREFIX_CHARS: usize = 2000;

/// Truncate text to a bounded character prefix
pub fn truncate_body(text: &str) -> &str {
    match text.char_indices().nth(BODY_PREFIX_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Body text for a prompt: content if present and non-empty, else the title
pub fn body_or_title<'a>(title: &'a str, content: Option<&'a str>) -> &'a str {
    match content {
        Some(c) if !c.trim().is_empty() => c,
        _ => title,
    }
}

/// Prompt demanding a bare attention-grabbing title (no JSON)
pub fn title_prompt(source_title: &str, source_body: &str) -> String {
    format!(
        "다음 뉴스 제목과 내용을 보고 클릭하고 싶은 매력적인 제목을 만들어 주세요.\n\
         - 제목 길이: 반드시 50자 이내로 작성\n\
         - 궁금증을 유발하는 제목\n\
         - 핵심 키워드 포함\n\
         - 응답은 제목 텍스트만 반환\n\n\
         기사 제목: {}\n\
         기사 내용: {}",
        source_title,
        truncate_body(source_body),
    )
}

/// Prompt demanding a single JSON issue-card object
pub fn issue_card_prompt(source_title: &str, source_body: &str) -> String {
    format!(
        "아래 내용을 기반으로 토론 이슈 카드를 생성하라.\n\
         반드시 JSON만 출력하고, 설명 문장은 절대 쓰지 마라.\n\n\
         ① 핵심 쟁점을 요약한 이슈 제목 (20자 내외)\n\
         ② 요약 설명 (3~5문장)\n\
         ③ 핵심 포인트 3~5개 (JSON 리스트)\n\
         ④ 중요도: 낮음/중간/높음 중 하나\n\
         ⑤ 추천 투표 방식: YESNO 또는 MULTI\n\n\
         제목: {}\n\
         내용: {}\n\n\
         출력(JSON):\n\
         {{\n\
             \"issue_title\": \"\",\n\
             \"issue_summary\": \"\",\n\
             \"key_points\": [],\n\
             \"importance\": \"\",\n\
             \"vote_type\": \"\"\n\
         }}",
        source_title,
        truncate_body(source_body),
    )
}

/// Prompt demanding a single JSON vote-proposal object
pub fn vote_proposal_prompt(issue_title: &str, issue_summary: &str) -> String {
    format!(
        "아래 이슈를 기반으로 예측 투표를 설계하라.\n\
         반드시 JSON만 출력하고, 설명 문장은 절대 쓰지 마라.\n\n\
         - question: 찬반을 물을 수 있는 명확한 질문 1개\n\
         - options: 투표 항목 제목 1~5개 (JSON 리스트)\n\
         - result_type: YES_NO 또는 YES_NO_DRAW\n\n\
         이슈 제목: {}\n\
         이슈 요약: {}\n\n\
         출력(JSON):\n\
         {{\n\
             \"question\": \"\",\n\
             \"options\": [],\n\
             \"result_type\": \"\"\n\
         }}",
        issue_title,
        truncate_body(issue_summary),
    )
}

/// Prompt demanding a single JSON vote-rule object
pub fn vote_rule_prompt(issue_title: &str, issue_summary: &str) -> String {
    format!(
        "아래 이슈의 투표 판정 규칙을 설계하라.\n\
         반드시 JSON만 출력하고, 설명 문장은 절대 쓰지 마라.\n\n\
         - rule_type: 판정 기준의 짧은 분류명\n\
         - rule_description: 판정 방법 설명 (2~3문장)\n\n\
         이슈 제목: {}\n\
         이슈 요약: {}\n\n\
         출력(JSON):\n\
         {{\n\
             \"rule_type\": \"\",\n\
             \"rule_description\": \"\"\n\
         }}",
        issue_title,
        truncate_body(issue_summary),
    )
}
