use chrono::{DateTime, Utc};
use serde::Serialize;

use illustra_core::domain::access::{AuthorizationRecord, PendingAccessRequest};
use illustra_core::domain::product::{
    Currency, Product, ProductCategory, ProductChoice, ProductFamily,
};
use illustra_core::domain::request::{RequestId, RequestStatus, StoredRequest};
use illustra_core::domain::user::UserId;
use illustra_core::errors::InterfaceError;
use illustra_core::flows::{
    Choice, FlowAction, Gender, IntakeData, SessionState, Smoking, ValidationFailure,
};

use crate::actions::ActionToken;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
const CUSTOM_LABEL: &str = "✏️ Others (custom)";

/// Requests shown per status group in `/status`.
pub const STATUS_GROUP_PREVIEW: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self { label: label.into(), token: token.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub text: String,
    pub markdown: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keyboard: Vec<Vec<Button>>,
}

impl MessageTemplate {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), markdown: false, keyboard: Vec::new() }
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.keyboard.iter().flatten()
    }

    pub fn has_button(&self, token: &str) -> bool {
        self.buttons().any(|button| button.token == token)
    }
}

pub struct MessageBuilder {
    text: String,
    markdown: bool,
    keyboard: Vec<Vec<Button>>,
}

impl MessageBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), markdown: false, keyboard: Vec::new() }
    }

    pub fn markdown(mut self) -> Self {
        self.markdown = true;
        self
    }

    pub fn row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut RowBuilder),
    {
        let mut builder = RowBuilder::default();
        build(&mut builder);
        let row = builder.build();
        if !row.is_empty() {
            self.keyboard.push(row);
        }
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { text: self.text, markdown: self.markdown, keyboard: self.keyboard }
    }
}

#[derive(Default)]
pub struct RowBuilder {
    buttons: Vec<Button>,
}

impl RowBuilder {
    pub fn button(&mut self, label: impl Into<String>, token: impl Into<String>) -> &mut Self {
        self.buttons.push(Button::new(label, token));
        self
    }

    pub fn choice(&mut self, label: impl Into<String>, choice: &Choice) -> &mut Self {
        self.button(label, choice.token())
    }

    fn build(self) -> Vec<Button> {
        self.buttons
    }
}

pub fn format_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%-d/%-m/%Y").to_string()
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%-d/%-m/%Y %H.%M.%S").to_string()
}

pub fn status_emoji(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "⏳",
        RequestStatus::Processing => "🔄",
        RequestStatus::Completed => "✅",
    }
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{summary}\n\n_Ref: {correlation_id}_")).markdown().build()
}

// ---------------------------------------------------------------------------------------------
// General commands
// ---------------------------------------------------------------------------------------------

pub fn unauthorized_greeting(first_name: &str) -> MessageTemplate {
    MessageTemplate::plain(format!(
        "👋 Hello {first_name}!\n\n🔒 You need authorization to use this bot.\n\nUse /requestaccess to request access from admin."
    ))
}

pub fn welcome(first_name: &str, is_admin: bool) -> MessageTemplate {
    let admin_commands = if is_admin {
        "\n\n*Admin Commands:*\n\
         /lists - View all requests\n\
         /lists pending - View pending requests\n\
         /lists processing - View processing requests\n\
         /lists completed - View completed requests\n\
         /setstatus [id] [status] - Update status manually\n\
         /pending - View pending access requests\n\
         /list - View all authorized users\n\
         /adduser [user_id] - Add user manually"
    } else {
        ""
    };

    MessageBuilder::new(format!(
        "👋 Selamat datang, {first_name}!\n\n\
         Saya adalah bot untuk permintaan ilustrasi asuransi.\n\n\
         Gunakan /request untuk memulai permintaan baru\n\
         Gunakan /cancel untuk membatalkan permintaan\n\
         Gunakan /help untuk bantuan{admin_commands}"
    ))
    .markdown()
    .build()
}

pub fn help(is_admin: bool) -> MessageTemplate {
    let admin_note = if is_admin { "\n\n_Use /adminhelp for admin commands_" } else { "" };

    MessageBuilder::new(format!(
        "📋 *Panduan Penggunaan*\n\n\
         /request - Mulai permintaan ilustrasi baru\n\
         /status - Cek status permintaan Anda\n\
         /cancel - Batalkan permintaan saat ini\n\
         /myid - Get your User ID\n\
         /help - Tampilkan panduan ini{admin_note}\n\n\
         Bot akan memandu Anda langkah demi langkah untuk mengisi data klien."
    ))
    .markdown()
    .build()
}

pub fn admin_help() -> MessageTemplate {
    MessageBuilder::new(
        "👑 *Admin Commands*\n\n\
         *Request Management:*\n\
         /lists - View all requests (last 20)\n\
         /lists pending - View pending requests\n\
         /lists processing - View processing requests\n\
         /lists completed - View completed requests\n\
         /setstatus [id] [status] - Update status manually\n\
         \u{20}\u{20}Example: /setstatus 1 processing\n\n\
         *User Management:*\n\
         /pending - View pending access requests\n\
         /list - View all authorized users\n\
         /adduser [user_id] - Add user manually\n\
         /removeuser [user_id] - Remove user access\n\
         /addadmin [user_id] - Make someone admin\n\n\
         *Status Options:*\n\
         • pending - Just submitted\n\
         • processing - CS is working on it\n\
         • completed - Illustration ready\n\n\
         _Note: Agents are notified when status changes from Pending to Processing_",
    )
    .markdown()
    .build()
}

pub fn admin_only() -> MessageTemplate {
    MessageTemplate::plain("❌ Admin only command.")
}

pub fn access_denied() -> MessageTemplate {
    MessageTemplate::plain("🔒 Access denied.\n\nUse /requestaccess to request authorization.")
}

pub fn my_id(user_id: UserId, name: &str, handle: Option<&str>) -> MessageTemplate {
    MessageBuilder::new(format!(
        "👤 *Your Information*\n\n🆔 User ID: `{user_id}`\n📛 Name: {name}\n📱 Username: @{}\n\n_Tap the User ID to copy it_",
        handle.unwrap_or("N/A")
    ))
    .markdown()
    .build()
}

pub fn status_overview(requests: &[StoredRequest]) -> MessageTemplate {
    if requests.is_empty() {
        return MessageBuilder::new(
            "📋 *Your Requests*\n\nNo requests found.\n\nUse /request to submit a new illustration request.",
        )
        .markdown()
        .build();
    }

    let mut text = String::from("📋 *Your Illustration Requests*\n\n");
    for status in RequestStatus::ALL {
        let group: Vec<&StoredRequest> =
            requests.iter().filter(|request| request.row.status == status).collect();
        if group.is_empty() {
            continue;
        }
        text.push_str(&format!("{} *{} ({})*\n", status_emoji(status), status, group.len()));
        for request in group.iter().take(STATUS_GROUP_PREVIEW) {
            text.push_str(&format!(
                "• {} - {}\n  {}\n",
                request.row.client_name,
                request.row.product,
                format_date(request.row.submitted_at)
            ));
        }
        text.push('\n');
    }
    text.push_str(&format!("\n_Total: {} request(s)_", requests.len()));

    MessageBuilder::new(text).markdown().build()
}

pub fn status_fetch_failed() -> MessageTemplate {
    MessageTemplate::plain(
        "❌ Error fetching your requests.\nPlease try again later or contact admin.",
    )
}

// ---------------------------------------------------------------------------------------------
// Access requests and user management
// ---------------------------------------------------------------------------------------------

pub fn already_authorized() -> MessageTemplate {
    MessageTemplate::plain("✅ You are already authorized to use this bot!")
}

pub fn access_request_already_pending() -> MessageTemplate {
    MessageTemplate::plain("⏳ Your access request is pending. Please wait for admin approval.")
}

pub fn access_request_submitted() -> MessageTemplate {
    MessageTemplate::plain(
        "✅ Access request submitted!\n\nYour request has been sent to the admin.\nYou will be notified once approved.",
    )
}

fn approval_row(builder: MessageBuilder, user: UserId) -> MessageBuilder {
    builder.row(|row| {
        row.button("✅ Approve", ActionToken::Approve(user).token())
            .button("❌ Reject", ActionToken::Reject(user).token());
    })
}

/// Sent to every admin when someone asks for access.
pub fn access_request_alert(request: &PendingAccessRequest) -> MessageTemplate {
    let builder = MessageBuilder::new(format!(
        "🔔 *New Access Request*\n\n👤 Name: {}\n🆔 User ID: {}\n📱 Username: @{}\n\nApprove or reject this request:",
        request.user_name,
        request.user_id,
        request.handle()
    ))
    .markdown();
    approval_row(builder, request.user_id).build()
}

pub fn no_pending_requests() -> MessageTemplate {
    MessageTemplate::plain("✅ No pending access requests.")
}

pub fn pending_requests_header(count: usize) -> MessageTemplate {
    MessageBuilder::new(format!("📋 *Pending Access Requests ({count})*")).markdown().build()
}

pub fn pending_request_card(request: &PendingAccessRequest) -> MessageTemplate {
    let builder = MessageBuilder::new(format!(
        "👤 *{}*\n🆔 User ID: {}\n📱 Username: @{}\n🕐 {}",
        request.user_name,
        request.user_id,
        request.handle(),
        format_timestamp(request.timestamp)
    ))
    .markdown();
    approval_row(builder, request.user_id).build()
}

pub fn authorized_users(record: &AuthorizationRecord) -> MessageTemplate {
    let mut text = String::from("👥 *Authorized Users*\n\n");
    text.push_str(&format!("*Admins ({}):*\n", record.admins.len()));
    for admin in &record.admins {
        text.push_str(&format!("• {admin}\n"));
    }
    text.push_str(&format!("\n*Users ({}):*\n", record.users.len()));
    for user in &record.users {
        text.push_str(&format!("• {user}\n"));
    }
    MessageBuilder::new(text).markdown().build()
}

pub fn invalid_user_id(command: &str) -> MessageTemplate {
    MessageTemplate::plain(format!("❌ Invalid user ID. Use: /{command} 123456789"))
}

pub fn user_added(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("✅ User {user} has been authorized."))
}

pub fn user_already_authorized(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("⚠️ User {user} is already authorized."))
}

pub fn access_granted() -> MessageTemplate {
    MessageBuilder::new("✅ *Access Granted!*\n\nYou can now use the bot.\nUse /request to start.")
        .markdown()
        .build()
}

pub fn user_removed(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("✅ User {user} has been removed."))
}

pub fn user_not_found(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("⚠️ User {user} not found."))
}

pub fn access_revoked() -> MessageTemplate {
    MessageTemplate::plain(
        "🔒 Your access has been revoked.\n\nContact admin if you believe this is an error.",
    )
}

pub fn admin_added(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("✅ User {user} is now an admin."))
}

pub fn already_admin(user: UserId) -> MessageTemplate {
    MessageTemplate::plain(format!("⚠️ User {user} is already an admin."))
}

pub fn admin_granted() -> MessageTemplate {
    MessageBuilder::new(
        "👑 *You are now an admin!*\n\nYou can now manage user access.\nUse /help to see admin commands.",
    )
    .markdown()
    .build()
}

pub fn approved_card(request: &PendingAccessRequest) -> MessageTemplate {
    MessageBuilder::new(format!(
        "✅ *APPROVED*\n\n👤 {}\n🆔 User ID: {}\n✓ Approved by admin",
        request.user_name, request.user_id
    ))
    .markdown()
    .build()
}

pub fn rejected_card(request: &PendingAccessRequest) -> MessageTemplate {
    MessageBuilder::new(format!(
        "❌ *REJECTED*\n\n👤 {}\n🆔 User ID: {}\n✗ Rejected by admin",
        request.user_name, request.user_id
    ))
    .markdown()
    .build()
}

pub fn access_approved_notice() -> MessageTemplate {
    MessageBuilder::new(
        "✅ *Access Granted!*\n\nYour request has been approved.\nYou can now use the bot.\n\nUse /request to start.",
    )
    .markdown()
    .build()
}

pub fn access_rejected_notice() -> MessageTemplate {
    MessageTemplate::plain("❌ Access request rejected.\n\nPlease contact admin for more information.")
}

pub fn admin_only_action() -> &'static str {
    "❌ Admin only action."
}

pub fn access_request_missing() -> &'static str {
    "Request not found or already processed."
}

/// Reply for any command whose backing store could not be reached.
pub fn service_failure(error: &InterfaceError) -> MessageTemplate {
    error_message(&format!("❌ {}", error.user_message()), error.correlation_id())
}

// ---------------------------------------------------------------------------------------------
// Intake conversation
// ---------------------------------------------------------------------------------------------

pub fn new_request_prompt() -> MessageTemplate {
    MessageBuilder::new("📝 *Permintaan Ilustrasi Baru*\n\nSilakan masukkan *nama lengkap klien*:")
        .markdown()
        .build()
}

pub fn request_cancelled() -> MessageTemplate {
    MessageTemplate::plain("❌ Permintaan dibatalkan.\n\nGunakan /request untuk memulai lagi.")
}

pub fn no_active_request() -> MessageTemplate {
    MessageTemplate::plain("Tidak ada permintaan aktif.")
}

pub fn session_expired() -> &'static str {
    "Session expired. Use /request to start again."
}

fn product_icon(choice: ProductChoice) -> &'static str {
    match choice {
        ProductChoice::TermLife => "🛡️",
        ProductChoice::Iul => "💰",
        ProductChoice::Savings => "💎",
        ProductChoice::SinglePremiumIdr => "🏛️",
        ProductChoice::SinglePremiumUsd => "💵",
    }
}

fn with_product_menu(mut builder: MessageBuilder) -> MessageBuilder {
    for choice in ProductChoice::MENU {
        builder = builder.row(|row| {
            row.choice(format!("{} {}", product_icon(choice), choice.label()), &Choice::Product(choice));
        });
    }
    builder
}

fn amount_question(product: Product) -> &'static str {
    match product.family() {
        ProductFamily::Savings => "Berapa *premium* yang ingin dibayarkan?",
        ProductFamily::SinglePremium => "Berapa *single premium* yang ingin dibayarkan?",
        ProductFamily::TermLife | ProductFamily::Iul => "Pilih *UP Jiwa coverage*:",
    }
}

fn gender_label(gender: Option<Gender>) -> &'static str {
    gender.map_or("-", Gender::as_str)
}

fn smoking_label(smoking: Option<Smoking>) -> &'static str {
    smoking.map_or("-", Smoking::as_str)
}

/// Prompt shown after a transition. `None` when the action has nothing to render on its
/// own (submission replies depend on the dispatch result).
pub fn flow_prompt(
    action: &FlowAction,
    from: SessionState,
    data: &IntakeData,
) -> Option<MessageTemplate> {
    let message = match action {
        FlowAction::PromptClientName => new_request_prompt(),
        FlowAction::PromptDateOfBirth => MessageBuilder::new(format!(
            "✅ Nama: {}\n\nMasukkan *tanggal lahir* klien (format: DD/MM/YYYY)\nContoh: 25/11/1990",
            data.client_name
        ))
        .markdown()
        .build(),
        FlowAction::PromptGender => {
            MessageBuilder::new(format!("✅ DOB: {}\n\nPilih *gender* klien:", data.client_dob))
                .markdown()
                .row(|row| {
                    row.choice("👨 Male", &Choice::Gender(Gender::Male))
                        .choice("👩 Female", &Choice::Gender(Gender::Female));
                })
                .build()
        }
        FlowAction::PromptSmoking => MessageBuilder::new(format!(
            "✅ Gender: {}\n\n*Smoking?*",
            gender_label(data.client_gender)
        ))
        .markdown()
        .row(|row| {
            row.choice("🚭 No", &Choice::Smoking(Smoking::No))
                .choice("🚬 Yes", &Choice::Smoking(Smoking::Yes));
        })
        .build(),
        FlowAction::PromptProduct => {
            let text = if from == SessionState::AwaitingProductDecision {
                "Pilih *produk* berikutnya:".to_owned()
            } else {
                format!(
                    "✅ Smoking: {}\n\nPilih *produk* (bisa pilih lebih dari 1):",
                    smoking_label(data.smoking)
                )
            };
            with_product_menu(MessageBuilder::new(text).markdown()).build()
        }
        FlowAction::PromptTermCurrency => MessageBuilder::new("Pilih *currency* untuk Term Life:")
            .markdown()
            .row(|row| {
                row.choice("💵 USD", &Choice::TermCurrency(Currency::Usd))
                    .choice("💴 SGD", &Choice::TermCurrency(Currency::Sgd));
            })
            .build(),
        FlowAction::PromptAmount => {
            let product = data.current_product.product?;
            let mut builder = MessageBuilder::new(format!(
                "✅ Produk: {}\n\n{}",
                product.display_name(),
                amount_question(product)
            ))
            .markdown();
            for option in product.amount_options() {
                builder = builder.row(|row| {
                    row.choice(option.label, &Choice::Amount(option.value.to_owned()));
                });
            }
            builder.row(|row| {
                row.choice(CUSTOM_LABEL, &Choice::CustomAmount);
            })
            .build()
        }
        FlowAction::PromptCustomAmount => {
            let product = data.current_product.product?;
            let text = match product.category() {
                ProductCategory::SavingsOrSinglePremium => {
                    "Masukkan *premium amount* custom:\n(contoh: $15,000/year atau IDR 150 juta)"
                }
                ProductCategory::Protection => {
                    "Masukkan *coverage amount* custom:\n(contoh: $750,000 atau IDR 750 juta)"
                }
            };
            MessageBuilder::new(text).markdown().build()
        }
        FlowAction::PromptTermPayment => {
            let product = data.current_product.product?;
            let amount = data.current_product.amount.as_deref().unwrap_or("-");
            let mut builder = MessageBuilder::new(format!(
                "✅ {}: {amount}\n\nPilih *Term of Payment*:",
                product.category().amount_label()
            ))
            .markdown();
            for option in product.term_options() {
                builder = builder.row(|row| {
                    row.choice(option.label, &Choice::TermPayment(option.value.to_owned()));
                });
            }
            builder.row(|row| {
                row.choice(CUSTOM_LABEL, &Choice::CustomTerm);
            })
            .build()
        }
        FlowAction::PromptCustomTerm => {
            MessageBuilder::new("Masukkan *term of payment* custom:\n(contoh: 15 years)")
                .markdown()
                .build()
        }
        FlowAction::OfferAnotherProduct => {
            let selection = data.last_selection()?;
            let term = match selection.product.fixed_term() {
                Some(term) => format!("{term} (Single Premium)"),
                None => selection.term_payment.clone(),
            };
            MessageBuilder::new(format!(
                "✅ {}: {}\n✅ Term of Payment: {term}\n\nProduk terpilih: {}\n\nIngin menambah produk lain?",
                selection.product.category().amount_label(),
                selection.amount,
                data.selected_products.len()
            ))
            .row(|row| {
                row.choice("➕ Tambah Produk Lain", &Choice::AddAnotherProduct)
                    .choice("✅ Lanjut ke Notes", &Choice::ProceedToNotes);
            })
            .build()
        }
        FlowAction::PromptNotes => {
            MessageBuilder::new("Ada *catatan tambahan*?\n(ketik \"tidak\" jika tidak ada)")
                .markdown()
                .build()
        }
        FlowAction::PresentConfirmation => MessageBuilder::new(format!(
            "📋 *Konfirmasi Data*\n\n{}\n\nApakah data sudah benar?",
            request_summary(data, false)
        ))
        .markdown()
        .row(|row| {
            row.choice("✅ Kirim Permintaan", &Choice::Confirm)
                .choice("❌ Batalkan", &Choice::Reject);
        })
        .build(),
        FlowAction::SubmitRequest => return None,
        FlowAction::DiscardSession => request_cancelled(),
    };
    Some(message)
}

pub fn validation_failure(failure: ValidationFailure) -> MessageTemplate {
    let text = match failure {
        ValidationFailure::EmptyClientName => {
            "❌ Nama klien tidak boleh kosong.\n\nSilakan masukkan *nama lengkap klien*:"
        }
        ValidationFailure::InvalidDateOfBirth => {
            "❌ Format tanggal tidak valid.\n\nGunakan format DD/MM/YYYY (contoh: 25/11/1990):"
        }
        ValidationFailure::EmptyCustomAmount => "❌ Jumlah tidak boleh kosong.\n\nSilakan masukkan jumlah custom:",
        ValidationFailure::EmptyCustomTerm => {
            "❌ Term of payment tidak boleh kosong.\n\nSilakan masukkan term of payment custom:"
        }
        ValidationFailure::EmptyNotes => {
            "❌ Catatan tidak boleh kosong.\n(ketik \"tidak\" jika tidak ada)"
        }
    };
    MessageBuilder::new(text).markdown().build()
}

/// Client and product summary. The operations variant adds a header and the agent line.
pub fn request_summary(data: &IntakeData, for_operations: bool) -> String {
    let mut text = String::new();
    if for_operations {
        text.push_str("🔔 *PERMINTAAN ILUSTRASI BARU*\n\n");
        text.push_str(&format!("👤 *Agent:* {} (ID: {})\n\n", data.agent_name, data.agent_id));
    }

    let products = data
        .selected_products
        .iter()
        .enumerate()
        .map(|(index, selection)| {
            format!(
                "{}. {}\n   {}: {}\n   Term: {}",
                index + 1,
                selection.product.display_name(),
                selection.product.category().amount_label(),
                selection.amount,
                selection.term_payment
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    text.push_str(&format!(
        "📋 *DATA KLIEN*\n{RULE}\n👤 Nama: {}\n🎂 DOB: {}\n⚧️ Gender: {}\n🚬 Smoking: {}\n\n",
        data.client_name,
        data.client_dob,
        gender_label(data.client_gender),
        smoking_label(data.smoking)
    ));
    text.push_str(&format!(
        "📦 *PRODUK ({})*\n{RULE}\n{products}\n\n",
        data.selected_products.len()
    ));
    text.push_str(&format!("📝 *CATATAN*\n{RULE}\n{}\n\n", data.notes));
    text.push_str(&format!("🕐 {}", format_timestamp(data.started_at)));
    text
}

pub fn submission_announcement(data: &IntakeData) -> MessageTemplate {
    MessageBuilder::new(request_summary(data, true)).markdown().build()
}

pub fn submission_succeeded(product_count: usize) -> MessageTemplate {
    MessageBuilder::new(format!(
        "✅ *Permintaan Berhasil Dikirim!*\n\n\
         {product_count} permintaan ilustrasi telah diteruskan ke tim CS.\n\
         Anda akan dihubungi segera.\n\n\
         Gunakan /request untuk permintaan baru."
    ))
    .markdown()
    .build()
}

pub fn submission_failed(error: &InterfaceError) -> MessageTemplate {
    error_message(
        &format!(
            "❌ Terjadi kesalahan saat mengirim permintaan.\n{}",
            error.user_message()
        ),
        error.correlation_id(),
    )
}

// ---------------------------------------------------------------------------------------------
// Request status management
// ---------------------------------------------------------------------------------------------

pub fn invalid_status() -> MessageTemplate {
    MessageTemplate::plain("❌ Invalid status. Use: pending, processing, or completed")
}

pub fn set_status_usage() -> MessageTemplate {
    MessageTemplate::plain("❌ Usage: /setstatus [id] [status]\nExample: /setstatus 1 processing")
}

pub fn no_requests(filter: Option<RequestStatus>) -> MessageTemplate {
    let filter_text = filter
        .map(|status| format!(" with status \"{}\"", status.as_str().to_ascii_lowercase()))
        .unwrap_or_default();
    MessageTemplate::plain(format!("📋 No requests found{filter_text}."))
}

pub fn requests_header(filter: Option<RequestStatus>, count: usize) -> MessageTemplate {
    let filter_text = filter
        .map(|status| format!(" ({})", status.as_str().to_ascii_lowercase()))
        .unwrap_or_default();
    MessageBuilder::new(format!("📋 *Requests{filter_text}*\n\nShowing {count} request(s)"))
        .markdown()
        .build()
}

/// Admin card for one row, with one button per status and the current one ticked.
pub fn request_card(request: &StoredRequest) -> MessageTemplate {
    let row = &request.row;
    let status = row.status;
    let text = format!(
        "📋 *Request #{}*\n{RULE}\n\
         👤 Client: {}\n📅 DOB: {}\n⚧️ Gender: {}\n🚬 Smoking: {}\n\
         🎯 Product: {}\n💰 Amount: {}\n📆 Term: {}\n\
         👨‍💼 Agent: {} (ID: {})\n📝 Notes: {}\n⏰ Submitted: {}\n\n\
         Current Status: {} *{}*",
        request.id,
        row.client_name,
        row.client_dob,
        row.client_gender,
        row.smoking,
        row.product,
        row.amount,
        row.term_payment,
        row.agent_name,
        row.agent_id,
        row.notes,
        format_timestamp(row.submitted_at),
        status_emoji(status),
        status
    );

    MessageBuilder::new(text)
        .markdown()
        .row(|buttons| {
            for option in RequestStatus::ALL {
                let marker = if option == status { " ✓" } else { "" };
                buttons.button(
                    format!("{} {}{marker}", status_emoji(option), option),
                    ActionToken::SetStatus { id: request.id, status: option }.token(),
                );
            }
        })
        .build()
}

pub fn lists_failed() -> MessageTemplate {
    MessageTemplate::plain("❌ Error fetching requests. Please try again.")
}

pub fn request_not_found(id: RequestId) -> MessageTemplate {
    MessageTemplate::plain(format!("❌ Request #{id} not found."))
}

pub fn status_updated(
    id: RequestId,
    client_name: &str,
    previous: RequestStatus,
    current: RequestStatus,
) -> MessageTemplate {
    MessageBuilder::new(format!(
        "✅ *Status Updated*\n\nRequest #{id}\nClient: {client_name}\n{previous} → {current}"
    ))
    .markdown()
    .build()
}

pub fn status_unchanged(id: RequestId, status: RequestStatus) -> MessageTemplate {
    MessageTemplate::plain(format!("⚠️ Request #{id} is already {status}."))
}

pub fn status_update_failed() -> MessageTemplate {
    MessageTemplate::plain("❌ Error updating status. Please try again.")
}

/// Direct message to the submitting agent.
pub fn agent_status_update(request: &StoredRequest, previous: RequestStatus) -> MessageTemplate {
    MessageBuilder::new(format!(
        "🔔 *Status Update*\n\nYour request for {} ({})\nStatus: {previous} → {}\n\nUse /status to see all your requests.",
        request.row.client_name, request.row.product, request.row.status
    ))
    .markdown()
    .build()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use illustra_core::domain::product::Product;
    use illustra_core::domain::request::{RequestId, RequestRow, RequestStatus, StoredRequest};
    use illustra_core::domain::user::UserId;
    use illustra_core::flows::{
        FlowAction, Gender, IntakeData, ProductSelection, SessionState, Smoking,
    };

    use super::{flow_prompt, request_card, request_summary, status_overview, MessageBuilder};

    fn stored(id: u32, client: &str, status: RequestStatus) -> StoredRequest {
        StoredRequest {
            id: RequestId(id),
            row: RequestRow {
                submitted_at: Utc.with_ymd_and_hms(2025, 3, 4, 8, 5, 0).single().expect("ts"),
                agent_id: UserId(7),
                agent_name: "Sari".to_owned(),
                client_name: client.to_owned(),
                client_dob: "15/03/1990".to_owned(),
                client_gender: "Male".to_owned(),
                smoking: "No".to_owned(),
                product: "IUL (USD)".to_owned(),
                amount: "$500,000".to_owned(),
                term_payment: "5 years".to_owned(),
                notes: "-".to_owned(),
                status,
            },
        }
    }

    fn filled_data() -> IntakeData {
        let mut data = IntakeData::new(
            UserId(7),
            "Sari Dewi",
            Utc.with_ymd_and_hms(2025, 3, 4, 8, 5, 0).single().expect("ts"),
        );
        data.client_name = "Budi".to_owned();
        data.client_dob = "15/03/1990".to_owned();
        data.client_gender = Some(Gender::Male);
        data.smoking = Some(Smoking::No);
        data.selected_products = vec![
            ProductSelection {
                product: Product::TermLifeUsd,
                amount: "$500,000".to_owned(),
                term_payment: "20 years".to_owned(),
            },
            ProductSelection {
                product: Product::SinglePremiumIdr,
                amount: "IDR 100 juta".to_owned(),
                term_payment: "1".to_owned(),
            },
        ];
        data.notes = "-".to_owned();
        data
    }

    #[test]
    fn builder_skips_empty_rows() {
        let message = MessageBuilder::new("fallback")
            .row(|_| {})
            .row(|row| {
                row.button("One", "one").button("Two", "two");
            })
            .build();

        assert_eq!(message.keyboard.len(), 1);
        assert!(message.has_button("two"));
        assert!(!message.markdown);
    }

    #[test]
    fn product_menu_uses_menu_tokens() {
        let data = filled_data();
        let message = flow_prompt(&FlowAction::PromptProduct, SessionState::AwaitingSmoking, &data)
            .expect("product prompt");

        for token in [
            "product_TERM",
            "product_IUL",
            "product_SAVINGS",
            "product_SINGLE_IDR",
            "product_SINGLE_USD",
        ] {
            assert!(message.has_button(token), "missing {token}");
        }
        assert!(message.text.starts_with("✅ Smoking: No"));

        let again =
            flow_prompt(&FlowAction::PromptProduct, SessionState::AwaitingProductDecision, &data)
                .expect("product prompt");
        assert_eq!(again.text, "Pilih *produk* berikutnya:");
    }

    #[test]
    fn term_prompt_offers_catalog_terms_and_custom() {
        let mut data = filled_data();
        data.current_product.product = Some(Product::TermLifeSgd);
        data.current_product.amount = Some("$250,000 SGD".to_owned());

        let message =
            flow_prompt(&FlowAction::PromptTermPayment, SessionState::AwaitingCoverage, &data)
                .expect("term prompt");

        assert!(message.text.starts_with("✅ Coverage: $250,000 SGD"));
        assert!(message.has_button("term_Till 88"));
        assert!(message.buttons().any(|button| button.label == "Till 88 (FWD only)"));
        assert!(message.has_button("term_custom"));
    }

    #[test]
    fn custom_amount_prompt_follows_the_product_category() {
        let mut data = filled_data();
        for (product, expected) in [
            (Product::TermLifeUsd, "*coverage amount*"),
            (Product::IulUsd, "*coverage amount*"),
            (Product::SavingsUsd, "*premium amount*"),
            (Product::SinglePremiumIdr, "*premium amount*"),
        ] {
            data.current_product.product = Some(product);
            let message =
                flow_prompt(&FlowAction::PromptCustomAmount, SessionState::AwaitingCoverageCustom, &data)
                    .expect("custom amount prompt");
            assert!(message.text.contains(expected), "{product}: {}", message.text);
        }
    }

    #[test]
    fn operations_summary_lists_each_product_with_its_label() {
        let summary = request_summary(&filled_data(), true);

        assert!(summary.starts_with("🔔 *PERMINTAAN ILUSTRASI BARU*"));
        assert!(summary.contains("👤 *Agent:* Sari Dewi (ID: 7)"));
        assert!(summary.contains("📦 *PRODUK (2)*"));
        assert!(summary.contains("1. Term Life (USD)\n   Coverage: $500,000\n   Term: 20 years"));
        assert!(summary.contains("2. Single Premi Wholelife (IDR)\n   Premium: IDR 100 juta\n   Term: 1"));

        let agent_view = request_summary(&filled_data(), false);
        assert!(agent_view.starts_with("📋 *DATA KLIEN*"));
    }

    #[test]
    fn status_overview_caps_each_group_and_counts_all() {
        let requests = vec![
            stored(1, "A", RequestStatus::Pending),
            stored(2, "B", RequestStatus::Pending),
            stored(3, "C", RequestStatus::Pending),
            stored(4, "D", RequestStatus::Pending),
            stored(5, "E", RequestStatus::Completed),
        ];

        let message = status_overview(&requests);

        assert!(message.text.contains("⏳ *Pending (4)*"));
        assert!(message.text.contains("• C - IUL (USD)"));
        assert!(!message.text.contains("• D - IUL (USD)"));
        assert!(!message.text.contains("Processing"));
        assert!(message.text.contains("✅ *Completed (1)*"));
        assert!(message.text.contains("_Total: 5 request(s)_"));
        assert!(message.text.contains("4/3/2025"));
    }

    #[test]
    fn request_card_ticks_the_current_status() {
        let message = request_card(&stored(12, "Budi", RequestStatus::Processing));

        let labels: Vec<&str> = message.buttons().map(|button| button.label.as_str()).collect();
        assert_eq!(labels, vec!["⏳ Pending", "🔄 Processing ✓", "✅ Completed"]);
        assert!(message.has_button("status_12_Completed"));
        assert!(message.text.contains("Current Status: 🔄 *Processing*"));
    }
}
