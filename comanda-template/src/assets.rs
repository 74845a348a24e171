//! Built-in default receipt template
//!
//! Used when no template path is configured. Sized for 32-column paper;
//! stores can replace it with their own template file.

pub const DEFAULT_TEMPLATE: &str = "\
================================
{{header_name}}
{{header_city}}
================================

*** ORDER #{{display_id}} ***
Date: {{order_date}}  Time: {{order_time}}
{{#if order_type}}
Type: {{order_type}}
{{/if}}

--------------------------------
CUSTOMER: {{customer_name}}
Phone: {{customer_phone}}
Address: {{customer_address}}
--------------------------------

QTY Description            Value
{{#each items}}
{{item_qty}}x {{item_name}}  {{item_unit_price}}
{{#each item_options}}
  -- {{option_qty}}x {{option_name}}  {{option_price}}
{{/each}}
{{#if item_note}}
  NOTE: {{item_note}}
{{/if}}
{{/each}}

--------------------------------
Items: {{item_count}}
Subtotal:       {{subtotal}}
{{#if delivery_fee}}
Delivery fee:   {{delivery_fee}}
{{/if}}
{{#if discount}}
Discount:       {{discount}}
{{/if}}
TOTAL:          {{total}}
--------------------------------

PAYMENTS
{{#each payments}}
{{payment_method}}  {{payment_value}}
{{/each}}

{{#if observations}}
NOTE: {{observations}}
{{/if}}
{{#if qr_url}}
[QR:{{qr_url}}]
{{/if}}
================================
Thank you!
================================
";
