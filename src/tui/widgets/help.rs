use ratatui::widgets::{Block, Borders, Paragraph, Clear, Wrap};
use ratatui::Frame;
use ratatui::layout::{Rect, Alignment, Constraint, Layout, Flex};
use crate::config::KeyBindings;
use crate::tui::widgets::color::Palette;
use crate::utils::format_key_binding_for_display as display;

pub fn render_help(f: &mut Frame, area: Rect, key_bindings: &KeyBindings, palette: &Palette) {
    let popup_area = popup_area(area, 60, 80);

    // Clear the background first so list content does not show through
    f.render_widget(Clear, popup_area);

    let paragraph = Paragraph::new(build_help_text(key_bindings))
        .block(Block::default()
            .borders(Borders::ALL)
            .title("Trợ giúp - Phím tắt")
            .title_alignment(Alignment::Center)
            .style(palette.base()))
        .style(palette.base())
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, popup_area);
}

/// Centered rect using a percentage of the available rect
/// Based on ratatui popup example: https://ratatui.rs/examples/apps/popup/
pub fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

fn build_help_text(kb: &KeyBindings) -> String {
    let mut text = String::new();

    text.push_str("Chung:\n");
    text.push_str(&format!("  {} / {}: Lịch công việc / Giáo án\n", display(&kb.tab_1), display(&kb.tab_2)));
    text.push_str(&format!("  {}: Chuyển khung\n", display(&kb.switch_pane)));
    text.push_str(&format!("  {} / {}: Lên / xuống\n", display(&kb.list_up), display(&kb.list_down)));
    text.push_str(&format!("  {}: Tìm kiếm (Enter giữ bộ lọc, Esc xóa)\n", display(&kb.search)));
    text.push_str(&format!("  {}: Đổi giao diện\n", display(&kb.cycle_theme)));
    text.push_str(&format!("  {}: Trợ giúp\n", display(&kb.help)));
    text.push_str(&format!("  {}: Thoát\n", display(&kb.quit)));
    text.push('\n');

    text.push_str("Lịch công việc:\n");
    text.push_str("  Mũi tên: Di chuyển ngày trên lịch\n");
    text.push_str(&format!("  {} / {}: Tháng trước / sau\n", display(&kb.prev_month), display(&kb.next_month)));
    text.push_str(&format!("  {}: Về hôm nay\n", display(&kb.today)));
    text.push_str(&format!("  {}: Thêm việc cho ngày đang chọn\n", display(&kb.new)));
    text.push_str(&format!("  {}: Thêm việc tồn đọng\n", display(&kb.backlog)));
    text.push_str(&format!("  {}: Đánh dấu xong / chưa xong\n", display(&kb.toggle_task_status)));
    text.push_str(&format!("  {}: Mở ngày của việc tồn đọng\n", display(&kb.select)));
    text.push_str(&format!("  {} (2 lần): Xóa việc\n", display(&kb.delete)));
    text.push('\n');

    text.push_str("Giáo án:\n");
    text.push_str(&format!("  {}: Thêm môn / bài học\n", display(&kb.new)));
    text.push_str(&format!("  {}: Thêm học phần\n", display(&kb.new_module)));
    text.push_str(&format!("  {}: Đổi tên / sửa bài học\n", display(&kb.edit)));
    text.push_str(&format!("  {} (2 lần): Xóa mục đang chọn\n", display(&kb.delete)));
    text.push_str(&format!("  {}: Sao chép link bài giảng\n", display(&kb.select)));
    text.push_str(&format!("  {}: Soạn dàn ý bài giảng\n", display(&kb.outline)));
    text.push('\n');

    text.push_str("Nhập dữ liệu AI:\n");
    text.push_str(&format!("  {}: Mở khung nhập\n", display(&kb.import)));
    text.push_str(&format!("  {}: Dán từ clipboard\n", display(&kb.paste)));
    text.push_str(&format!("  {}: Xác nhận nhập dữ liệu\n", display(&kb.submit)));
    text.push_str("  Esc: Đóng\n");

    text
}
